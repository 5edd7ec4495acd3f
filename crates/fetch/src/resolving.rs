use std::sync::Arc;

use relaydrop_transfer::{BoxFuture, ProgressReporter, TransferStatus};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetcher::{SourceFetcher, StagedFile};
use crate::filename::sanitize_file_name;
use crate::staging::StagingDir;

/// Name and size a provider reports for a file identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub name: String,
    /// 0 when the provider does not know.
    pub size_bytes: u64,
}

/// One piece of a provider download.
#[derive(Debug, Clone)]
pub struct ProviderChunk {
    pub data: Vec<u8>,
    /// Provider-reported completion, 0.0–1.0.
    pub progress: f64,
}

/// Sequential chunk stream opened by a [`MetadataResolver`].
pub trait ByteSource: Send {
    /// Next chunk, or `None` once the download is complete.
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<ProviderChunk>, FetchError>>;
}

/// Provider that maps file identifiers to metadata and content.
pub trait MetadataResolver: Send + Sync {
    fn resolve<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<RemoteMetadata, FetchError>>;

    fn open_stream<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn ByteSource>, FetchError>>;
}

/// Fetches by identifier through a [`MetadataResolver`].
///
/// Progress follows the provider's reported fraction. The payload is held in
/// memory and written to staging only once the stream has finished.
pub struct ResolvingFetcher {
    resolver: Arc<dyn MetadataResolver>,
    staging: StagingDir,
}

impl ResolvingFetcher {
    pub fn new(resolver: Arc<dyn MetadataResolver>, staging: StagingDir) -> Self {
        Self { resolver, staging }
    }

    async fn download(
        &self,
        id: &str,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<StagedFile, FetchError> {
        let meta = self.resolver.resolve(id).await?;
        status.file_name = sanitize_file_name(&meta.name);
        status.set_file_size(meta.size_bytes);
        info!(id, file = %status.file_name, size = meta.size_bytes, "identifier resolved");

        let mut source = self.resolver.open_stream(id).await?;
        let mut payload = Vec::new();

        while let Some(chunk) = source.next_chunk().await? {
            payload.extend_from_slice(&chunk.data);

            let progress = if chunk.progress.is_finite() {
                chunk.progress.clamp(0.0, 1.0)
            } else {
                0.0
            };
            status.advance_to((progress * status.file_size() as f64) as u64);
            reporter.report(status);
        }

        self.staging.ensure().await?;
        let path = self.staging.path_for(&status.file_name)?;
        tokio::fs::write(&path, &payload).await?;
        debug!(path = %path.display(), bytes = payload.len(), "identifier staged");

        Ok(StagedFile {
            path,
            file_name: status.file_name.clone(),
            size: payload.len() as u64,
        })
    }
}

impl SourceFetcher for ResolvingFetcher {
    fn fetch<'a>(
        &'a self,
        origin: &'a str,
        status: &'a mut TransferStatus,
        reporter: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<StagedFile, FetchError>> {
        Box::pin(self.download(origin, status, reporter))
    }
}
