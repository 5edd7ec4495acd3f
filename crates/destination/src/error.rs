//! Upload error types.

/// Errors produced while moving a staged file into a destination store.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk rejected: {0}")]
    Rejected(String),

    #[error("upload session {0} expired or unknown")]
    UnknownSession(String),

    #[error("offset mismatch: destination has {expected} bytes, cursor says {actual}")]
    OffsetMismatch { expected: u64, actual: u64 },

    #[error("insufficient space: need {needed} bytes, {available} available")]
    InsufficientSpace { needed: u64, available: u64 },

    #[error("{0} already exists")]
    Conflict(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] relaydrop_transfer::TransferError),
}
