//! Job scheduling for the relay.
//!
//! Front ends submit [`JobDescriptor`]s through a shared [`RelayContext`];
//! a single [`QueueRunner`] drains the [`TransferQueue`] one job at a time,
//! fetching each origin into staging and uploading it to the destination.

mod context;
mod error;
mod job;
pub mod origin;
mod queue;
mod runner;

pub use context::{RelayContext, RelaySettings};
pub use error::{ConfigError, JobError, RunnerError};
pub use job::{JobDescriptor, OriginKind};
pub use queue::{QueueSnapshot, TransferQueue};
pub use runner::QueueRunner;
