//! Inference collaborator error types.

use thiserror::Error;

/// Errors from the rigging inference collaborator.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The job exceeded its deadline.
    #[error("rig job timed out")]
    Timeout,

    /// The collaborator could not be reached.
    #[error("inference service unreachable: {0}")]
    Unreachable(String),

    /// The collaborator answered with a non-success status.
    #[error("inference service rejected the job (status {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The collaborator's reply could not be decoded.
    #[error("invalid inference response: {0}")]
    Decode(String),

    /// Client-side configuration problem.
    #[error("inference configuration error: {0}")]
    Config(String),
}

/// Result type for inference operations.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;
