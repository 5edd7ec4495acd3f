use std::time::Instant;

use crate::TransferError;
use crate::sink::{ChatRef, MessageRef};

/// Which leg of the relay a job is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Origin → staging storage.
    Downloading,
    /// Staging storage → destination.
    Uploading,
}

/// Mutable progress record for one in-flight job.
///
/// `completed_bytes` only moves forward within a phase and is reset exactly
/// once, by [`begin_upload`](Self::begin_upload).
#[derive(Debug, Clone)]
pub struct TransferStatus {
    chat: ChatRef,
    message: MessageRef,
    /// Provisional until the source resolves it.
    pub file_name: String,
    file_size: u64,
    phase: Phase,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    completed_bytes: u64,
}

impl TransferStatus {
    /// Creates a status in the downloading phase with unknown name and size.
    pub fn new(chat: ChatRef, message: MessageRef) -> Self {
        let now = Instant::now();
        Self {
            chat,
            message,
            file_name: String::new(),
            file_size: 0,
            phase: Phase::Downloading,
            started_at: now,
            last_sample_at: now,
            last_sample_bytes: 0,
            completed_bytes: 0,
        }
    }

    pub fn chat(&self) -> &ChatRef {
        &self.chat
    }

    pub fn message(&self) -> &MessageRef {
        &self.message
    }

    /// Total size in bytes, 0 while unknown.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    pub fn last_sample(&self) -> (Instant, u64) {
        (self.last_sample_at, self.last_sample_bytes)
    }

    /// Sets the total size. Never shrinks below what is already completed.
    pub fn set_file_size(&mut self, size: u64) {
        self.file_size = size.max(self.completed_bytes);
    }

    /// Moves the completed counter to `bytes`, clamped to the known size.
    ///
    /// Values below the current counter are ignored. Returns the counter
    /// after the update.
    pub fn advance_to(&mut self, bytes: u64) -> u64 {
        let bytes = if self.file_size > 0 {
            bytes.min(self.file_size)
        } else {
            bytes
        };
        self.completed_bytes = self.completed_bytes.max(bytes);
        self.completed_bytes
    }

    /// Switches to the upload phase for a staged payload of `size` bytes.
    pub fn begin_upload(&mut self, size: u64) -> Result<(), TransferError> {
        if self.phase == Phase::Uploading {
            return Err(TransferError::PhaseAlreadyAdvanced);
        }
        self.phase = Phase::Uploading;
        self.completed_bytes = 0;
        self.file_size = size;
        self.last_sample_bytes = 0;
        self.last_sample_at = Instant::now();
        Ok(())
    }

    /// Records the throughput sampling point.
    pub(crate) fn record_sample(&mut self, at: Instant) {
        self.last_sample_at = at;
        self.last_sample_bytes = self.completed_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> TransferStatus {
        TransferStatus::new(ChatRef("chat".into()), MessageRef("msg".into()))
    }

    #[test]
    fn new_status_is_downloading_and_unknown() {
        let s = status();
        assert_eq!(s.phase(), Phase::Downloading);
        assert_eq!(s.file_size(), 0);
        assert_eq!(s.completed_bytes(), 0);
        assert!(s.file_name.is_empty());
    }

    #[test]
    fn advance_is_monotonic() {
        let mut s = status();
        s.set_file_size(100);
        assert_eq!(s.advance_to(40), 40);
        assert_eq!(s.advance_to(20), 40);
        assert_eq!(s.advance_to(70), 70);
    }

    #[test]
    fn advance_clamps_to_known_size() {
        let mut s = status();
        s.set_file_size(50);
        assert_eq!(s.advance_to(80), 50);
    }

    #[test]
    fn advance_unbounded_while_size_unknown() {
        let mut s = status();
        assert_eq!(s.advance_to(1234), 1234);
    }

    #[test]
    fn set_file_size_never_below_completed() {
        let mut s = status();
        s.advance_to(300);
        s.set_file_size(100);
        assert_eq!(s.file_size(), 300);
    }

    #[test]
    fn begin_upload_resets_once() {
        let mut s = status();
        s.set_file_size(100);
        s.advance_to(100);

        s.begin_upload(100).unwrap();
        assert_eq!(s.phase(), Phase::Uploading);
        assert_eq!(s.completed_bytes(), 0);
        assert_eq!(s.last_sample().1, 0);

        s.advance_to(60);
        assert!(matches!(
            s.begin_upload(100),
            Err(TransferError::PhaseAlreadyAdvanced)
        ));
        assert_eq!(s.completed_bytes(), 60);
    }
}
