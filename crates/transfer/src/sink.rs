//! Notification sink abstraction.
//!
//! The relay never talks to a chat service directly. Whatever front end
//! accepted the job implements [`NotificationSink`] so progress and outcome
//! messages reach the watcher.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque destination for a job's notifications (a chat, a channel, a terminal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatRef(pub String);

/// Opaque handle to a message previously sent through a sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(pub String);

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors a sink may report. Callers treat progress edits as best-effort.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("rate limited")]
    RateLimited,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers text notifications to a watcher.
pub trait NotificationSink: Send + Sync {
    /// Sends a new message and returns a handle for later edits.
    fn send_message(
        &self,
        chat: &ChatRef,
        text: &str,
    ) -> BoxFuture<'_, Result<MessageRef, NotifyError>>;

    /// Replaces the text of a previously sent message.
    fn edit_message(
        &self,
        chat: &ChatRef,
        message: &MessageRef,
        text: &str,
    ) -> BoxFuture<'_, Result<(), NotifyError>>;
}
