use std::path::{Component, Path, PathBuf};

use relaydrop_transfer::{BoxFuture, validate_relative_path};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::store::{CommitInfo, DestinationStore, SessionCursor, SpaceUsage, WriteMode};

/// Subdirectory holding open sessions.
const SESSIONS_DIR: &str = ".sessions";

/// Destination store backed by a local directory.
///
/// Each session is a file under `.sessions/`; its length is the session
/// offset. Committing renames the session file into place. A session whose
/// append or commit fails is discarded, and open sessions do not count as
/// used space.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    quota_bytes: u64,
}

impl DirectoryStore {
    /// `quota_bytes` of 0 means unlimited.
    pub fn new(root: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            root: root.into(),
            quota_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, UploadError> {
        // Session ids are simple uuids; anything else is not ours.
        if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UploadError::UnknownSession(session_id.to_string()));
        }
        Ok(self.sessions_dir().join(session_id))
    }

    fn target_path(&self, commit: &CommitInfo) -> Result<PathBuf, UploadError> {
        let relative = commit.path.trim_start_matches('/');
        validate_relative_path(relative)?;
        let normalized: PathBuf = Path::new(relative)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        if normalized.starts_with(SESSIONS_DIR) {
            return Err(UploadError::Rejected(format!(
                "reserved path: {}",
                commit.path
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Checks that `incoming` bytes still fit under the quota.
    async fn ensure_room(&self, incoming: u64) -> Result<(), UploadError> {
        if self.quota_bytes == 0 {
            return Ok(());
        }
        let used = committed_size(&self.root).await?;
        let available = self.quota_bytes.saturating_sub(used);
        if incoming > available {
            return Err(UploadError::InsufficientSpace {
                needed: incoming,
                available,
            });
        }
        Ok(())
    }

    async fn create_session(&self, data: &[u8]) -> Result<String, UploadError> {
        self.ensure_room(data.len() as u64).await?;
        tokio::fs::create_dir_all(self.sessions_dir()).await?;

        let session_id = uuid::Uuid::new_v4().simple().to_string();
        tokio::fs::write(self.session_path(&session_id)?, data).await?;
        Ok(session_id)
    }

    async fn append(&self, cursor: &SessionCursor, data: &[u8]) -> Result<PathBuf, UploadError> {
        let path = self.session_path(&cursor.session_id)?;
        let held = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::UnknownSession(cursor.session_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        if held != cursor.offset {
            return Err(UploadError::OffsetMismatch {
                expected: held,
                actual: cursor.offset,
            });
        }

        self.ensure_room(held + data.len() as u64).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(path)
    }

    async fn commit(&self, session_path: &Path, commit: &CommitInfo) -> Result<(), UploadError> {
        let target = self.target_path(commit)?;
        if commit.mode == WriteMode::Add && tokio::fs::try_exists(&target).await? {
            return Err(UploadError::Conflict(commit.path.clone()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(session_path, &target).await?;
        info!(path = %target.display(), "object committed");
        Ok(())
    }

    async fn store_whole(&self, commit: &CommitInfo, data: Vec<u8>) -> Result<(), UploadError> {
        // Validate before spending a session on it.
        self.target_path(commit)?;
        let session_id = self.create_session(&data).await?;
        let path = self.session_path(&session_id)?;
        if let Err(e) = self.commit(&path, commit).await {
            self.discard(&path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn extend(&self, cursor: &SessionCursor, data: &[u8]) -> Result<(), UploadError> {
        match self.append(cursor, data).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.discard_session(&cursor.session_id).await;
                Err(e)
            }
        }
    }

    async fn finish(
        &self,
        cursor: &SessionCursor,
        data: Vec<u8>,
        commit: &CommitInfo,
    ) -> Result<(), UploadError> {
        if let Err(e) = self.target_path(commit) {
            self.discard_session(&cursor.session_id).await;
            return Err(e);
        }
        let path = match self.append(cursor, &data).await {
            Ok(path) => path,
            Err(e) => {
                self.discard_session(&cursor.session_id).await;
                return Err(e);
            }
        };
        if let Err(e) = self.commit(&path, commit).await {
            self.discard(&path).await;
            return Err(e);
        }
        debug!(session = %cursor.session_id, "session finished");
        Ok(())
    }

    async fn discard_session(&self, session_id: &str) {
        if let Ok(path) = self.session_path(session_id) {
            self.discard(&path).await;
        }
    }

    async fn discard(&self, session_path: &Path) {
        match tokio::fs::remove_file(session_path).await {
            Ok(()) => debug!(path = %session_path.display(), "session discarded"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %session_path.display(), error = %e, "failed to discard session")
            }
        }
    }

    async fn usage(&self) -> Result<SpaceUsage, UploadError> {
        let used = match tokio::fs::metadata(&self.root).await {
            Ok(_) => committed_size(&self.root).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(SpaceUsage {
            used,
            allocated: self.quota_bytes,
        })
    }
}

/// Total size of regular files below `root`, open sessions excluded.
async fn committed_size(root: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut pending = vec![root.to_path_buf()];
    let sessions = root.join(SESSIONS_DIR);

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                let path = entry.path();
                if path != sessions {
                    pending.push(path);
                }
            } else if file_type.is_file() {
                total += entry.metadata().await?.len();
            }
        }
    }

    Ok(total)
}

impl DestinationStore for DirectoryStore {
    fn upload_whole<'a>(
        &'a self,
        commit: &'a CommitInfo,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(self.store_whole(commit, data))
    }

    fn start_session(&self, data: Vec<u8>) -> BoxFuture<'_, Result<String, UploadError>> {
        Box::pin(async move { self.create_session(&data).await })
    }

    fn append_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(async move { self.extend(cursor, &data).await })
    }

    fn finish_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
        commit: &'a CommitInfo,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(self.finish(cursor, data, commit))
    }

    fn space_usage(&self) -> BoxFuture<'_, Result<SpaceUsage, UploadError>> {
        Box::pin(self.usage())
    }
}
