use std::sync::atomic::{AtomicU64, Ordering};

use relaydrop_transfer::{BoxFuture, ChatRef, MessageRef, NotificationSink, NotifyError};
use tokio::io::AsyncWriteExt;

/// Prints notifications to stdout.
///
/// Edits are printed in full as they arrive; the progress reporter already
/// coalesces them.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    next_id: AtomicU64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

async fn print(text: String) -> Result<(), NotifyError> {
    let mut out = tokio::io::stdout();
    out.write_all(text.as_bytes())
        .await
        .map_err(|e| NotifyError::Delivery(e.to_string()))?;
    out.flush()
        .await
        .map_err(|e| NotifyError::Delivery(e.to_string()))
}

impl NotificationSink for ConsoleSink {
    fn send_message(
        &self,
        chat: &ChatRef,
        text: &str,
    ) -> BoxFuture<'_, Result<MessageRef, NotifyError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let line = format!("[{chat} #{id}] {text}\n");
        Box::pin(async move {
            print(line).await?;
            Ok(MessageRef(id.to_string()))
        })
    }

    fn edit_message(
        &self,
        chat: &ChatRef,
        message: &MessageRef,
        text: &str,
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        let block = format!("[{chat} #{message} edited]\n{text}\n");
        Box::pin(print(block))
    }
}
