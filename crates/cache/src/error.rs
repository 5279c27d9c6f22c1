//! Cache error types.

use thiserror::Error;

/// Errors from the rigged-artifact cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar record could not be serialized.
    #[error("sidecar serialization error: {0}")]
    Sidecar(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
