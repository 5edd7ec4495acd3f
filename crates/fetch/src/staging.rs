use std::path::{Path, PathBuf};

use relaydrop_transfer::validate_relative_path;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Local directory holding payloads between the fetch and upload phases.
#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), FetchError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| FetchError::Staging {
                path: self.root.clone(),
                source,
            })
    }

    /// Path a payload named `file_name` is staged at.
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf, FetchError> {
        validate_relative_path(file_name)?;
        Ok(self.root.join(file_name))
    }

    /// Removes a staged file. Returns whether a file was actually deleted.
    pub async fn remove(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "staged file removed");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove staged file");
                false
            }
        }
    }
}
