pub mod auth;
pub mod handlers;
pub mod router;
pub mod ws_types;

use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Data from the last good fetch, flagged with the current error if any.
    pub fn with_error(data: T, error: Option<String>) -> Self {
        Self {
            success: error.is_none(),
            data: Some(data),
            error,
        }
    }
}
