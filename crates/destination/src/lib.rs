//! Destination side of a relay job.
//!
//! [`ChunkedUploader`] moves a staged file into a [`DestinationStore`],
//! either in one call or through the start/append/finish session protocol.
//! [`DirectoryStore`] is a store backed by a local directory.

mod directory;
mod error;
mod store;
mod uploader;

pub use directory::DirectoryStore;
pub use error::UploadError;
pub use store::{CommitInfo, DestinationStore, SessionCursor, SpaceUsage, WriteMode};
pub use uploader::{ChunkedUploader, Uploaded};
