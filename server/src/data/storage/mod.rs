//! Span storage boundary
//!
//! The collector hands each decorated batch to a `SpanConsumer`. A consumer
//! declares the schema it prefers; ingestion converts batches to that schema
//! before collection so decorators run on what will be stored.

mod error;
mod memory;

pub use error::StorageError;
pub use memory::InMemoryStorage;

use async_trait::async_trait;

use crate::domain::spans::{SchemaVersion, SpanBatch};

#[async_trait]
pub trait SpanConsumer: Send + Sync {
    async fn accept(&self, spans: SpanBatch) -> Result<(), StorageError>;

    fn schema(&self) -> SchemaVersion;
}
