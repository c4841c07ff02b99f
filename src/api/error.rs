use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::persist::PersistError;

/// Error surface of the read API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Query parameters failed validation; never reaches storage.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] PersistError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Store(e) => {
                tracing::error!(error = %e, "read query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}
