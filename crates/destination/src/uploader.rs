use std::path::Path;
use std::sync::Arc;

use relaydrop_transfer::{ChunkReader, DEFAULT_UPLOAD_CHUNK_SIZE, ProgressReporter, TransferStatus};
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::store::{CommitInfo, DestinationStore, SessionCursor};

/// Result of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// Destination path the payload was committed to.
    pub path: String,
    pub bytes: u64,
}

/// Uploads staged files into a [`DestinationStore`].
///
/// Files up to `chunk_size` bytes are sent in one call. Larger files use the
/// session protocol with every chunk exactly `chunk_size` except the last.
pub struct ChunkedUploader {
    store: Arc<dyn DestinationStore>,
    chunk_size: usize,
}

impl ChunkedUploader {
    /// If `chunk_size` is 0, [`DEFAULT_UPLOAD_CHUNK_SIZE`] is used.
    pub fn new(store: Arc<dyn DestinationStore>, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_UPLOAD_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self { store, chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Uploads `staged` to `/<status.file_name>`, overwriting.
    ///
    /// Moves `status` into the upload phase first. The staged file is
    /// deleted after a successful commit and left alone on failure.
    pub async fn upload(
        &self,
        staged: &Path,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<Uploaded, UploadError> {
        let mut reader = ChunkReader::open(staged, self.chunk_size).await?;
        let size = reader.file_size();
        status.begin_upload(size)?;

        let commit = CommitInfo::overwrite(format!("/{}", status.file_name));

        if size <= self.chunk_size as u64 {
            let data = reader.read_rest().await?;
            self.store.upload_whole(&commit, data).await?;
            status.advance_to(size);
            reporter.report(status);
        } else {
            self.upload_session(&mut reader, &commit, status, reporter)
                .await?;
        }

        info!(path = %commit.path, bytes = size, "upload committed");

        if let Err(e) = tokio::fs::remove_file(staged).await {
            warn!(path = %staged.display(), error = %e, "failed to remove staged file");
        }

        Ok(Uploaded {
            path: commit.path,
            bytes: size,
        })
    }

    async fn upload_session(
        &self,
        reader: &mut ChunkReader,
        commit: &CommitInfo,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<(), UploadError> {
        let size = reader.file_size();
        let first = reader.next_chunk().await?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "staged file shrank before upload",
            )
        })?;

        let session_id = self.store.start_session(first.data).await?;
        let mut cursor = SessionCursor {
            session_id,
            offset: reader.offset(),
        };
        debug!(session = %cursor.session_id, size, "upload session started");
        status.advance_to(cursor.offset);
        reporter.report(status);

        while let Some(chunk) = reader.next_chunk().await? {
            let end = chunk.end();
            if end >= size {
                self.store
                    .finish_session(&cursor, chunk.data, commit)
                    .await?;
            } else {
                self.store.append_session(&cursor, chunk.data).await?;
            }

            cursor.offset = end;
            status.advance_to(end);
            reporter.report(status);
        }

        Ok(())
    }
}
