use std::path::Path;

use futures_util::TryStreamExt;
use relaydrop_transfer::{
    BoxFuture, DEFAULT_DOWNLOAD_CHUNK_SIZE, ProgressReporter, TransferStatus, read_up_to,
};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use crate::client::DEFAULT_HTTP_TIMEOUT;
use crate::error::FetchError;
use crate::fetcher::{SourceFetcher, StagedFile};
use crate::filename::resolve_file_name;
use crate::staging::StagingDir;

/// What the HEAD probe learned about a link.
#[derive(Debug)]
struct Probe {
    final_url: reqwest::Url,
    content_type: Option<String>,
    content_length: u64,
    disposition: Option<String>,
}

/// Fetches a plain HTTP(S) link.
///
/// A HEAD request (redirects followed) resolves the final URL, size and file
/// name; the body is then streamed from the final URL into staging in
/// `chunk_size` pieces.
pub struct DirectLinkFetcher {
    client: reqwest::Client,
    staging: StagingDir,
    chunk_size: usize,
    probe_timeout: std::time::Duration,
}

impl DirectLinkFetcher {
    /// If `chunk_size` is 0, [`DEFAULT_DOWNLOAD_CHUNK_SIZE`] is used.
    pub fn new(client: reqwest::Client, staging: StagingDir, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_DOWNLOAD_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            client,
            staging,
            chunk_size,
            probe_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Overrides the HEAD probe deadline.
    pub fn with_probe_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    async fn probe(&self, url: &str) -> Result<Probe, FetchError> {
        let resp = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        check_status(&resp)?;

        let header = |name: HeaderName| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        // HEAD bodies are empty, so the announced length lives only in the header.
        let content_length = header(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Probe {
            final_url: resp.url().clone(),
            content_type: header(CONTENT_TYPE),
            content_length,
            disposition: header(CONTENT_DISPOSITION),
        })
    }

    async fn download(
        &self,
        url: &str,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<StagedFile, FetchError> {
        let request_url = reqwest::Url::parse(url)
            .map_err(|e| FetchError::InvalidLink(format!("{url}: {e}")))?;
        let probe = self.probe(url).await?;

        status.file_name = resolve_file_name(
            probe.disposition.as_deref(),
            &request_url,
            probe.content_type.as_deref(),
        );
        status.set_file_size(probe.content_length);
        info!(
            url = %probe.final_url,
            file = %status.file_name,
            size = probe.content_length,
            "link resolved"
        );

        self.staging.ensure().await?;
        let path = self.staging.path_for(&status.file_name)?;

        let resp = self.client.get(probe.final_url.clone()).send().await?;
        check_status(&resp)?;

        let body = resp.bytes_stream().map_err(std::io::Error::other);
        let reader = std::pin::pin!(StreamReader::new(body));

        let mut file = tokio::fs::File::create(&path).await?;
        let copied = self.copy_body(reader, &mut file, status, reporter).await;
        drop(file);

        match copied {
            Ok(size) => {
                debug!(path = %path.display(), bytes = size, "link staged");
                Ok(StagedFile {
                    path,
                    file_name: status.file_name.clone(),
                    size,
                })
            }
            Err(e) => {
                discard_partial(&path).await;
                Err(e)
            }
        }
    }

    async fn copy_body<R>(
        &self,
        mut reader: R,
        file: &mut tokio::fs::File,
        status: &mut TransferStatus,
        reporter: &ProgressReporter,
    ) -> Result<u64, FetchError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            let n = read_up_to(&mut reader, &mut buf)
                .await
                .map_err(|e| FetchError::Stream(e.to_string()))?;
            if n == 0 {
                break;
            }

            file.write_all(&buf[..n]).await?;
            written += n as u64;

            // Servers sometimes announce less than they send.
            if status.file_size() > 0 && written > status.file_size() {
                status.set_file_size(written);
            }
            status.advance_to(written);
            reporter.report(status);

            if n < buf.len() {
                break;
            }
        }

        file.flush().await?;
        Ok(written)
    }
}

impl SourceFetcher for DirectLinkFetcher {
    fn fetch<'a>(
        &'a self,
        origin: &'a str,
        status: &'a mut TransferStatus,
        reporter: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<StagedFile, FetchError>> {
        Box::pin(self.download(origin, status, reporter))
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), FetchError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            status: resp.status().as_u16(),
            url: resp.url().to_string(),
        })
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "partial download removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial download"),
    }
}
