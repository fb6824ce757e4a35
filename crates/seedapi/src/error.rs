use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use seedcore::access::{DenyReason, LookupFailure};
use seedcore::messaging::MessagingError;
use seedcore::storage::StorageError;
use seedcore::{MalformedResourceKey, VerificationFailure};

/// Request failure, rendered as `{"error": <short>, "message": <detail>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable label for the `error` field.
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    /// Maps a refused authorization to its response.
    pub fn from_denial(reason: &DenyReason) -> Self {
        match reason {
            DenyReason::NoGrant => ApiError::Forbidden("file is not shared with you".to_string()),
            DenyReason::LookupError(LookupFailure::NotFound) => ApiError::NotFound("file not found".to_string()),
            DenyReason::LookupError(LookupFailure::Unavailable(detail)) => {
                ApiError::Unavailable(format!("metadata store unavailable: {}", detail))
            }
            DenyReason::LookupError(LookupFailure::TimedOut) => {
                ApiError::Unavailable("metadata lookup timed out".to_string())
            }
        }
    }
}

impl From<VerificationFailure> for ApiError {
    fn from(failure: VerificationFailure) -> Self {
        ApiError::Unauthorized(format!("invalid init data: {}", failure))
    }
}

impl From<MalformedResourceKey> for ApiError {
    fn from(err: MalformedResourceKey) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::Unavailable(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
