use std::sync::Arc;

use relaydrop_destination::{ChunkedUploader, Uploaded};
use relaydrop_transfer::{ChatRef, MessageRef, ProgressReporter, TransferStatus};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::RelayContext;
use crate::error::{ConfigError, JobError, RunnerError};
use crate::job::JobDescriptor;

/// Drains the queue one job at a time: fetch into staging, then upload.
pub struct QueueRunner {
    ctx: Arc<RelayContext>,
}

impl QueueRunner {
    pub fn new(ctx: Arc<RelayContext>) -> Self {
        Self { ctx }
    }

    /// Runs until `cancel` fires or a fatal error occurs.
    ///
    /// Cancellation is observed between jobs; an in-flight job always runs
    /// to completion.
    pub async fn run_forever(&self, cancel: CancellationToken) -> Result<(), RunnerError> {
        self.ctx
            .staging()
            .ensure()
            .await
            .map_err(RunnerError::Staging)?;
        info!(staging = %self.ctx.staging().root().display(), "queue runner started");

        let poll = self.ctx.settings().poll_interval;
        while !cancel.is_cancelled() {
            if self.tick().await? {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(poll) => {}
            }
        }

        info!("queue runner stopped");
        Ok(())
    }

    /// Runs the next job if the runner is idle. Returns whether one ran.
    pub async fn tick(&self) -> Result<bool, RunnerError> {
        let Some(job) = self.ctx.queue().try_begin() else {
            return Ok(false);
        };

        let outcome = self.run_job(&job).await;
        self.ctx.queue().finish();
        outcome.map(|()| true)
    }

    async fn run_job(&self, job: &JobDescriptor) -> Result<(), RunnerError> {
        info!(job = %job.label(), kind = ?job.kind, "job started");

        let message = match self.ctx.sink().send_message(&job.chat, "Starting...").await {
            Ok(message) => message,
            Err(e) => {
                // Progress edits against this handle fail quietly.
                warn!(chat = %job.chat, error = %e, "failed to post start message");
                MessageRef(String::new())
            }
        };

        let mut status = TransferStatus::new(job.chat.clone(), message.clone());
        status.file_name = job.label().to_string();
        let reporter = ProgressReporter::spawn(
            self.ctx.sink().clone(),
            job.chat.clone(),
            message,
            self.ctx.load().clone(),
            self.ctx.settings().engine_label.clone(),
        );

        let result = self.transfer(job, &mut status, &reporter).await;
        reporter.finish().await;

        match result {
            Ok(uploaded) => {
                info!(
                    job = %job.label(),
                    path = %uploaded.path,
                    bytes = uploaded.bytes,
                    elapsed_ms = status.started_at().elapsed().as_millis() as u64,
                    "job completed"
                );
                self.notify(&job.chat, &format!("Done: {}", status.file_name))
                    .await;
                Ok(())
            }
            Err(JobError::Fetch(e)) if e.is_fatal() => {
                error!(job = %job.label(), error = %e, "staging failed, stopping runner");
                self.notify(&job.chat, &format!("Failed: {e}")).await;
                Err(RunnerError::Staging(e))
            }
            Err(e) => {
                error!(job = %job.label(), error = %e, "job failed");
                self.notify(&job.chat, &format!("Failed: {e}")).await;
                Ok(())
            }
        }
    }

    async fn transfer(
        &self,
        job: &JobDescriptor,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<Uploaded, JobError> {
        let store = self
            .ctx
            .destination()
            .ok_or(ConfigError::DestinationNotConfigured)?;
        let fetcher = self.ctx.fetcher_for(job.kind)?;

        let staged = fetcher.fetch(&job.origin, status, reporter).await?;

        let uploader = ChunkedUploader::new(store, self.ctx.settings().upload_chunk_size);
        match uploader.upload(&staged.path, status, reporter).await {
            Ok(uploaded) => Ok(uploaded),
            Err(e) => {
                self.ctx.staging().remove(&staged.path).await;
                Err(e.into())
            }
        }
    }

    async fn notify(&self, chat: &ChatRef, text: &str) {
        if let Err(e) = self.ctx.sink().send_message(chat, text).await {
            warn!(chat = %chat, error = %e, "failed to deliver job notification");
        }
    }
}
