//! API error types and HTTP error responses.

use armature_core::SessionId;
use armature_inference::InferenceError;
use armature_metadata::MetadataError;
use armature_storage::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// API error type for all handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The uploaded buffer is not a parseable GLB container.
    #[error("invalid model container: {0}")]
    InvalidContainer(String),

    /// The rig engine did not answer within the configured deadline.
    #[error("rig job exceeded the inference deadline")]
    InferenceTimeout,

    /// The rig engine was unreachable or rejected the job.
    #[error("rig engine failure: {0}")]
    InferenceFailure(String),

    /// No live cache entry for the session (never cached, expired, or
    /// already consumed by a save).
    #[error("no cached rig for session {0}")]
    CacheMiss(SessionId),

    /// A durable write failed during finalization. The cache entry is
    /// preserved so the save can be retried without re-rigging.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The caller does not own the resource it is acting on.
    #[error("ownership mismatch for {0}")]
    OwnershipMismatch(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl ApiError {
    /// Stable failure class exposed on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidContainer(_) => "invalid_container",
            Self::InferenceTimeout => "inference_timeout",
            Self::InferenceFailure(_) => "inference_failure",
            Self::CacheMiss(_) => "cache_miss",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::OwnershipMismatch(_) => "ownership_mismatch",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal",
            Self::Storage(StorageError::NotFound(_)) => "not_found",
            Self::Storage(_) => "internal",
            Self::Metadata(MetadataError::NotFound(_)) => "not_found",
            Self::Metadata(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            "invalid_container" => StatusCode::UNPROCESSABLE_ENTITY,
            "inference_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "inference_failure" | "persistence_failure" => StatusCode::BAD_GATEWAY,
            "cache_miss" | "not_found" => StatusCode::NOT_FOUND,
            "ownership_mismatch" => StatusCode::FORBIDDEN,
            "bad_request" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(error: InferenceError) -> Self {
        match error {
            InferenceError::Timeout => Self::InferenceTimeout,
            other => Self::InferenceFailure(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
