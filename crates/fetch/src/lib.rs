//! Origin fetchers.
//!
//! A fetch is the first phase of a relay job: resolve the origin, stream its
//! bytes into the staging directory and keep the job's
//! [`TransferStatus`](relaydrop_transfer::TransferStatus) current while doing
//! so.

mod client;
mod direct;
mod error;
mod fetcher;
mod filename;
mod resolving;
mod staging;

pub use client::{DEFAULT_HTTP_TIMEOUT, http_client, http_client_builder};
pub use direct::DirectLinkFetcher;
pub use error::FetchError;
pub use fetcher::{SourceFetcher, StagedFile};
pub use filename::{extension_for_content_type, filename_from_disposition, sanitize_file_name};
pub use resolving::{ByteSource, MetadataResolver, ProviderChunk, RemoteMetadata, ResolvingFetcher};
pub use staging::StagingDir;
