use std::path::PathBuf;

use relaydrop_transfer::{BoxFuture, ProgressReporter, TransferStatus};

use crate::error::FetchError;

/// A payload fully written to staging storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Bytes actually written.
    pub size: u64,
}

/// Streams bytes from an origin into staging storage.
///
/// Implementations set `status.file_name` and `status.file_size` once the
/// origin is resolved, advance `completed_bytes` as data lands and call
/// `reporter.report` after every chunk.
pub trait SourceFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        origin: &'a str,
        status: &'a mut TransferStatus,
        reporter: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<StagedFile, FetchError>>;
}
