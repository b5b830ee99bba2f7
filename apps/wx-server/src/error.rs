//! Error types for the HTTP service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};
use wx_core::ValidationError;
use wx_db::DbError;
use wx_sync::SyncError;

/// HTTP API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid range: {0}")]
    InvalidRange(ValidationError),

    #[error("Station ID not found")]
    StationUnresolved,

    #[error("Weather data not available")]
    NotAvailable,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidRange(_) | ApiError::StationUnresolved => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field of the response body.
    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidRange(ValidationError::RangeTooLarge { .. }) => {
                "Error: Time range exceeds 30 days. Please request a shorter range.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::InvalidRange(e) => ApiError::InvalidRange(e),
            SyncError::StationUnresolved
            | SyncError::StationNotFound(_)
            | SyncError::StationUnavailable { .. } => ApiError::StationUnresolved,
            SyncError::RemoteTransport(_)
            | SyncError::RemoteStatus { .. }
            | SyncError::DeserializationFailed(_)
            | SyncError::EmptyReading => ApiError::Upstream(error.to_string()),
            SyncError::DatabaseError(msg) => ApiError::Database(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        ApiError::Database(error.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        ApiError::InvalidRange(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
