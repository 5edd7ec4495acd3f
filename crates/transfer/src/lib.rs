//! Transfer status tracking, chunked file reading and progress reporting.
//!
//! Shared by the fetch (origin → staging) and upload (staging →
//! destination) phases of a relay job.

mod chunked;
mod progress;
mod sink;
mod status;
mod validation;

pub use chunked::{Chunk, ChunkReader, read_up_to};
pub use progress::{
    ProgressReporter, ProgressSnapshot, format_bytes, format_eta, render_bar,
};
pub use sink::{BoxFuture, ChatRef, MessageRef, NotificationSink, NotifyError};
pub use status::{Phase, TransferStatus};
pub use validation::validate_relative_path;

/// Default upload chunk size and single-shot threshold: 8 MiB.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default download chunk size: 4 MiB.
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("transfer already in upload phase")]
    PhaseAlreadyAdvanced,
}
