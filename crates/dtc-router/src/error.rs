//! Error types for dtc-router.

use thiserror::Error;

/// Router error types.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Result type alias for router operations.
pub type RouterResult<T> = std::result::Result<T, RouterError>;
