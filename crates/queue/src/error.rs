//! Queue and runner error types.

use relaydrop_destination::UploadError;
use relaydrop_fetch::FetchError;

/// Relay misconfiguration detected before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("destination storage is not configured")]
    DestinationNotConfigured,
}

/// Why a single job failed. The runner reports it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Conditions that stop the runner altogether.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("staging storage unavailable: {0}")]
    Staging(#[source] FetchError),
}
