use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::services::Phase;
use crate::AppState;

/// Prometheus scrape. Feed health is sampled at scrape time.
pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    for (feed, phase) in [
        ("sales", state.sales.snapshot().phase),
        ("metrics", state.metrics.snapshot().phase),
    ] {
        let up = if phase == Phase::Failed { 0.0 } else { 1.0 };
        metrics::gauge!("feed_up", "feed" => feed).set(up);
    }

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}
