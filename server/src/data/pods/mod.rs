//! Pod metadata lookup
//!
//! - `types` - pod key and metadata records
//! - `fetcher` - HTTP/local-file retrieval of metadata documents
//! - `cache` - get-or-fetch cache keyed by pod key

mod cache;
mod error;
mod fetcher;
mod types;

pub use cache::MetadataCache;
pub use error::{FetchError, PodKeyError};
pub use fetcher::{HttpMetadataFetcher, MetadataFetcher, parse_container_details};
pub use types::{ContainerDetails, PodKey, PodMetadata, ResolvedPod};

#[cfg(test)]
pub(crate) use cache::tests::{CountingFetcher, pod1_metadata};
