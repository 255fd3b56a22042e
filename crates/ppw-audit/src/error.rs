//! Error types for audit persistence.

use thiserror::Error;

/// Errors raised while auditing a write.
#[derive(Debug, Error)]
pub enum Error {
    /// Change-set computation failed.
    #[error(transparent)]
    Audit(#[from] ppw_audit_core::Error),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Audit sink rejected an operation.
    #[error("session error: {0}")]
    Session(String),

    /// The asynchronous dispatch was cancelled.
    #[error("audit dispatch cancelled")]
    Cancelled,
}
