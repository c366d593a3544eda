use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Always open: liveness and scrape
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Dashboard data; bearer auth applies when API_TOKEN is set
    let protected = Router::new()
        .route("/api/sales", get(handlers::sales::list))
        .route("/api/dashboard/metrics", get(handlers::dashboard::metrics))
        .route("/api/affiliates", get(handlers::affiliates::list))
        .route("/api/refetch", post(handlers::sales::refetch))
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
