use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::job::JobDescriptor;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<JobDescriptor>,
    current: Option<String>,
}

/// FIFO of pending jobs plus the single in-flight slot.
///
/// Every operation takes the one lock for the length of an in-memory
/// mutation, so `current` is `Some` exactly while a job runs and no
/// interleaving can start a second one.
#[derive(Debug, Default)]
pub struct TransferQueue {
    state: Mutex<QueueState>,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub current: Option<String>,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Queue size: {}\nCurrent: {}",
            self.pending,
            self.current.as_deref().unwrap_or("None")
        )
    }
}

impl TransferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `job`; returns its 1-based position among not-started jobs.
    pub fn enqueue(&self, job: JobDescriptor) -> usize {
        let mut state = self.lock();
        state.pending.push_back(job);
        let position = state.pending.len();
        debug!(position, "job queued");
        position
    }

    /// Drops every pending job and returns how many there were.
    ///
    /// The in-flight job is not affected.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        dropped
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.lock();
        QueueSnapshot {
            pending: state.pending.len(),
            current: state.current.clone(),
        }
    }

    /// Pops the head and marks it current, unless a job is already running.
    pub fn try_begin(&self) -> Option<JobDescriptor> {
        let mut state = self.lock();
        if state.current.is_some() {
            return None;
        }
        let job = state.pending.pop_front()?;
        state.current = Some(job.label().to_string());
        Some(job)
    }

    /// Clears the in-flight slot.
    pub fn finish(&self) {
        self.lock().current = None;
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}
