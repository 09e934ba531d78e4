use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::db::StoreError;

/// Request-level failures, mapped to a JSON `{"error": ...}` body.
///
/// Read-path collaborator failures are generally absorbed before reaching
/// this type (empty lists, apology text); what surfaces here is bad input,
/// a missing record, a missing configuration, or a write failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request input. No downstream call was attempted.
    #[error("{0}")]
    ClientInput(String),

    #[error("{0}")]
    NotFound(String),

    /// A required external service is not configured for this process.
    #[error("{0} is not configured. Set {1}.")]
    Configuration(&'static str, &'static str),

    #[error("database error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ClientInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration(_, _) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self:#}");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
