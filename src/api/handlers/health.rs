use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::services::live_query::Phase;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let sales = state.sales.snapshot().phase;
    let metrics = state.metrics.snapshot().phase;

    if sales == Phase::Failed && metrics == Phase::Failed {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "sales": sales, "metrics": metrics })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "sales": sales, "metrics": metrics })),
        )
    }
}
