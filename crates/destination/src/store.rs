use std::fmt;

use relaydrop_transfer::{BoxFuture, format_bytes};

use crate::error::UploadError;

/// How a commit treats an existing object at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the path is taken.
    Add,
    /// Replace whatever is there.
    Overwrite,
}

/// Where and how a finished upload lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Destination path, rooted at `/`.
    pub path: String,
    pub mode: WriteMode,
}

impl CommitInfo {
    pub fn overwrite(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: WriteMode::Overwrite,
        }
    }
}

/// Position within an open upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCursor {
    pub session_id: String,
    /// Bytes the destination has accepted so far.
    pub offset: u64,
}

/// Space accounting reported by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    pub used: u64,
    /// 0 when the store has no limit.
    pub allocated: u64,
}

impl SpaceUsage {
    pub fn is_unlimited(&self) -> bool {
        self.allocated == 0
    }

    pub fn free(&self) -> u64 {
        self.allocated.saturating_sub(self.used)
    }
}

impl fmt::Display for SpaceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Used: {}", format_bytes(self.used))?;
        if self.is_unlimited() {
            write!(f, "Free: unlimited\nTotal: unlimited")
        } else {
            write!(
                f,
                "Free: {}\nTotal: {}",
                format_bytes(self.free()),
                format_bytes(self.allocated)
            )
        }
    }
}

/// Storage service a relay job uploads into.
///
/// Small payloads go through [`upload_whole`](Self::upload_whole); larger
/// ones open a session with the first chunk, append middle chunks at the
/// cursor and commit with the last one.
pub trait DestinationStore: Send + Sync {
    fn upload_whole<'a>(
        &'a self,
        commit: &'a CommitInfo,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>>;

    /// Opens a session holding `data`; returns its id.
    fn start_session(&self, data: Vec<u8>) -> BoxFuture<'_, Result<String, UploadError>>;

    fn append_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>>;

    /// Appends the final `data` and commits the session to `commit`.
    fn finish_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
        commit: &'a CommitInfo,
    ) -> BoxFuture<'a, Result<(), UploadError>>;

    fn space_usage(&self) -> BoxFuture<'_, Result<SpaceUsage, UploadError>>;
}
