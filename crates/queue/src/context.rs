use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use relaydrop_destination::DestinationStore;
use relaydrop_fetch::{
    DEFAULT_HTTP_TIMEOUT, DirectLinkFetcher, FetchError, MetadataResolver, ResolvingFetcher,
    SourceFetcher, StagingDir, http_client,
};
use relaydrop_telemetry::LoadMonitor;
use relaydrop_transfer::{
    DEFAULT_DOWNLOAD_CHUNK_SIZE, DEFAULT_UPLOAD_CHUNK_SIZE, NotificationSink,
};
use tracing::info;

use crate::error::{ConfigError, JobError};
use crate::job::{JobDescriptor, OriginKind};
use crate::queue::{QueueSnapshot, TransferQueue};

/// Tunables shared by the runner and fetchers.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub staging_dir: PathBuf,
    /// Single-shot threshold and session chunk size.
    pub upload_chunk_size: usize,
    pub download_chunk_size: usize,
    /// Idle sleep between queue polls.
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    /// Shown on the progress message while uploading.
    pub engine_label: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("temp_downloads"),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            download_chunk_size: DEFAULT_DOWNLOAD_CHUNK_SIZE,
            poll_interval: Duration::from_secs(1),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            engine_label: "relaydrop".into(),
        }
    }
}

/// Everything a relay needs, shared as `Arc<RelayContext>` between the
/// front end and the [`QueueRunner`](crate::QueueRunner).
pub struct RelayContext {
    settings: RelaySettings,
    queue: TransferQueue,
    destination: RwLock<Option<Arc<dyn DestinationStore>>>,
    sink: Arc<dyn NotificationSink>,
    link_fetcher: Arc<dyn SourceFetcher>,
    identifier_fetcher: Option<Arc<dyn SourceFetcher>>,
    staging: StagingDir,
    load: Arc<LoadMonitor>,
}

impl RelayContext {
    /// Creates a context with an explicit link fetcher.
    pub fn new(
        settings: RelaySettings,
        sink: Arc<dyn NotificationSink>,
        link_fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        let staging = StagingDir::new(&settings.staging_dir);
        Self {
            settings,
            queue: TransferQueue::new(),
            destination: RwLock::new(None),
            sink,
            link_fetcher,
            identifier_fetcher: None,
            staging,
            load: Arc::new(LoadMonitor::new()),
        }
    }

    /// Creates a context fetching links over HTTP with the settings' timeouts.
    pub fn with_http(
        settings: RelaySettings,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, FetchError> {
        let client = http_client(settings.http_timeout)?;
        let fetcher = DirectLinkFetcher::new(
            client,
            StagingDir::new(&settings.staging_dir),
            settings.download_chunk_size,
        )
        .with_probe_timeout(settings.http_timeout);
        Ok(Self::new(settings, sink, Arc::new(fetcher)))
    }

    /// Enables identifier jobs through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn MetadataResolver>) -> Self {
        let fetcher = ResolvingFetcher::new(resolver, self.staging.clone());
        self.identifier_fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Replaces the fetcher used for identifier jobs.
    pub fn with_identifier_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.identifier_fetcher = Some(fetcher);
        self
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn queue(&self) -> &TransferQueue {
        &self.queue
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    pub fn staging(&self) -> &StagingDir {
        &self.staging
    }

    pub fn load(&self) -> &Arc<LoadMonitor> {
        &self.load
    }

    /// Sets or replaces the destination store.
    pub fn configure_destination(&self, store: Arc<dyn DestinationStore>) {
        *self
            .destination
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(store);
        info!("destination configured");
    }

    pub fn destination(&self) -> Option<Arc<dyn DestinationStore>> {
        self.destination
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queues `job`; returns its 1-based position.
    ///
    /// Refused, with the queue untouched, while no destination is set.
    pub fn submit(&self, job: JobDescriptor) -> Result<usize, ConfigError> {
        if self.destination().is_none() {
            return Err(ConfigError::DestinationNotConfigured);
        }
        let origin = job.origin.clone();
        let position = self.queue.enqueue(job);
        info!(job = %origin, position, "job submitted");
        Ok(position)
    }

    /// Drops all pending jobs; returns how many.
    pub fn cancel_all(&self) -> usize {
        let dropped = self.queue.cancel_all();
        info!(dropped, "pending jobs cancelled");
        dropped
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Fetcher responsible for `kind`.
    pub fn fetcher_for(&self, kind: OriginKind) -> Result<Arc<dyn SourceFetcher>, FetchError> {
        match kind {
            OriginKind::Link => Ok(self.link_fetcher.clone()),
            OriginKind::Identifier => self
                .identifier_fetcher
                .clone()
                .ok_or(FetchError::NoResolver),
        }
    }

    /// Renders the destination's used / free / total space.
    pub async fn storage_report(&self) -> Result<String, JobError> {
        let store = self
            .destination()
            .ok_or(ConfigError::DestinationNotConfigured)?;
        let usage = store.space_usage().await?;
        Ok(format!("Storage:\n{usage}"))
    }
}
