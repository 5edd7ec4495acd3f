//! Error types for origin fetches.

use std::path::PathBuf;

use relaydrop_transfer::TransferError;

/// Errors produced while moving bytes from an origin into staging storage.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("origin unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("origin returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("staging directory {path} unavailable: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid staged file: {0}")]
    Transfer(#[from] TransferError),

    #[error("metadata lookup failed: {0}")]
    Metadata(String),

    #[error("stream interrupted: {0}")]
    Stream(String),

    #[error("no metadata resolver configured")]
    NoResolver,
}

impl FetchError {
    /// Whether the error means no later job can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Staging { .. })
    }
}
