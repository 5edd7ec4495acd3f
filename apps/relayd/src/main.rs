//! relaydrop daemon.
//!
//! Reads one command per line from stdin:
//! - `status`: queue size and current job
//! - `cancel`: drop all pending jobs
//! - `storage`: destination space usage
//! - anything else is treated as a share link or direct download URL
//!
//! Replies and job progress are printed to stdout; logs go to stderr.

mod config;
mod console_sink;

use std::sync::Arc;

use relaydrop_destination::DirectoryStore;
use relaydrop_queue::{JobDescriptor, QueueRunner, RelayContext};
use relaydrop_transfer::{ChatRef, NotificationSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::RelayConfig;
use console_sink::ConsoleSink;

const HELP: &str = "Commands: status | cancel | storage | <link>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,relaydrop=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = RelayConfig::load().unwrap_or_default();
    let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleSink::new());
    let ctx = Arc::new(RelayContext::with_http(cfg.settings(), sink)?);

    match &cfg.destination {
        Some(dest) => {
            info!(root = %dest.root.display(), quota = dest.quota_bytes, "using directory destination");
            ctx.configure_destination(Arc::new(DirectoryStore::new(&dest.root, dest.quota_bytes)));
        }
        None => warn!("no destination configured, submissions will be refused"),
    }

    let cancel = CancellationToken::new();
    let mut runner_task = tokio::spawn({
        let runner = QueueRunner::new(ctx.clone());
        let cancel = cancel.clone();
        async move { runner.run_forever(cancel).await }
    });

    let chat = ChatRef("console".into());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let finished = loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(&ctx, &chat, line.trim()).await,
                Ok(None) => {
                    debug!("stdin closed, running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break None;
            }
            result = &mut runner_task => break Some(result),
        }
    };

    let result = match finished {
        Some(result) => result,
        None => {
            cancel.cancel();
            runner_task.await
        }
    };

    match result? {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "queue runner stopped");
            Err(e.into())
        }
    }
}

async fn handle_line(ctx: &RelayContext, chat: &ChatRef, line: &str) {
    let reply = match line {
        "" => return,
        "help" => HELP.to_string(),
        "status" => ctx.queue_snapshot().to_string(),
        "cancel" => format!("Cancelled {} pending transfers.", ctx.cancel_all()),
        "storage" => match ctx.storage_report().await {
            Ok(report) => report,
            Err(e) => format!("Error: {e}"),
        },
        text => match JobDescriptor::from_text(text, chat.clone()) {
            Some(job) => match ctx.submit(job) {
                Ok(position) => format!("Queued. Position: {position}"),
                Err(e) => format!("Error: {e}"),
            },
            None => "Please send a valid share link or direct download URL.".to_string(),
        },
    };

    if let Err(e) = ctx.sink().send_message(chat, &reply).await {
        warn!(error = %e, "failed to print reply");
    }
}
