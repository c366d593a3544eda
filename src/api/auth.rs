use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::AppState;

/// Guards the dashboard routes with `Authorization: Bearer <API_TOKEN>`.
/// A deployment without `API_TOKEN` serves them openly.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_token.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(req).await,
        Some(_) => AppError::Unauthorized("Invalid token").into_response(),
        None => AppError::Unauthorized("Missing bearer token").into_response(),
    }
}
