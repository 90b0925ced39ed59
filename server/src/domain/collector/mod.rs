//! Span collection
//!
//! ```text
//! request ─▶ sample ─▶ decorator 1 ─▶ ... ─▶ decorator N ─▶ storage ─▶ callback
//! ```
//!
//! Decorators run inline on the accepting task in registration order, each
//! fed the previous one's output. Only decorators supporting the batch's
//! schema run. Completion is signalled once the storage write was attempted.

mod sampler;

pub use sampler::CollectorSampler;

use std::sync::Arc;

use crate::data::storage::{SpanConsumer, StorageError};
use crate::domain::decorator::{RequestInfo, SpanDecorator};
use crate::domain::spans::{SchemaVersion, SpanBatch};

/// Completion signal for one accepted batch
pub trait Callback: Send {
    fn on_complete(self, result: Result<(), StorageError>);
}

impl<F> Callback for F
where
    F: FnOnce(Result<(), StorageError>) + Send,
{
    fn on_complete(self, result: Result<(), StorageError>) {
        self(result)
    }
}

/// Signals through a oneshot channel; a dropped receiver is ignored.
pub struct OneshotCallback(pub tokio::sync::oneshot::Sender<Result<(), StorageError>>);

impl Callback for OneshotCallback {
    fn on_complete(self, result: Result<(), StorageError>) {
        let _ = self.0.send(result);
    }
}

pub struct SpanCollector {
    sampler: CollectorSampler,
    decorators: Vec<Arc<dyn SpanDecorator>>,
    storage: Arc<dyn SpanConsumer>,
}

impl SpanCollector {
    pub fn builder(storage: Arc<dyn SpanConsumer>) -> SpanCollectorBuilder {
        SpanCollectorBuilder {
            sampler: CollectorSampler::always(),
            decorators: Vec::new(),
            storage,
        }
    }

    /// Schema the storage expects batches in
    pub fn schema(&self) -> SchemaVersion {
        self.storage.schema()
    }

    pub fn decorator_names(&self) -> Vec<&'static str> {
        self.decorators.iter().map(|d| d.name()).collect()
    }

    pub async fn accept_spans<C: Callback>(
        &self,
        request: &RequestInfo,
        mut spans: SpanBatch,
        callback: C,
    ) {
        let received = spans.len();
        spans.retain(|trace_id, debug| self.sampler.is_sampled(trace_id, debug));
        if spans.len() < received {
            tracing::debug!(
                dropped = received - spans.len(),
                kept = spans.len(),
                "Dropped unsampled spans"
            );
        }

        if spans.is_empty() {
            callback.on_complete(Ok(()));
            return;
        }

        for decorator in &self.decorators {
            if !decorator.supports_schema(spans.version()) {
                continue;
            }
            spans = decorator.decorate(request, spans).await;
        }

        let count = spans.len();
        let result = self.storage.accept(spans).await;
        match &result {
            Ok(()) => tracing::debug!(spans = count, "Stored spans"),
            Err(e) => tracing::error!(spans = count, error = %e, "Failed to store spans"),
        }
        callback.on_complete(result);
    }

    /// Accept a batch and wait for the storage outcome
    pub async fn accept(&self, request: &RequestInfo, spans: SpanBatch) -> Result<(), StorageError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.accept_spans(request, spans, OneshotCallback(tx)).await;
        rx.await
            .unwrap_or_else(|_| Err(StorageError::Unavailable("collector dropped the result".to_string())))
    }
}

pub struct SpanCollectorBuilder {
    sampler: CollectorSampler,
    decorators: Vec<Arc<dyn SpanDecorator>>,
    storage: Arc<dyn SpanConsumer>,
}

impl SpanCollectorBuilder {
    pub fn sampler(mut self, sampler: CollectorSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Append a decorator; runs after those already registered
    pub fn decorator(mut self, decorator: Arc<dyn SpanDecorator>) -> Self {
        let supported = [SchemaVersion::V1, SchemaVersion::V2]
            .into_iter()
            .any(|v| decorator.supports_schema(v));
        if supported {
            tracing::debug!(decorator = decorator.name(), "Registered span decorator");
            self.decorators.push(decorator);
        } else {
            tracing::warn!(
                decorator = decorator.name(),
                "Decorator supports no span schema, ignoring"
            );
        }
        self
    }

    pub fn build(self) -> SpanCollector {
        SpanCollector {
            sampler: self.sampler,
            decorators: self.decorators,
            storage: self.storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::InMemoryStorage;
    use crate::domain::spans::v2;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Appends its name to a shared log and tags spans with it
    struct Recording {
        name: &'static str,
        schema: Option<SchemaVersion>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl SpanDecorator for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports_schema(&self, version: SchemaVersion) -> bool {
            self.schema == Some(version)
        }

        async fn decorate(&self, _request: &RequestInfo, spans: SpanBatch) -> SpanBatch {
            self.log.lock().push(self.name);
            match spans {
                SpanBatch::V2(spans) => {
                    SpanBatch::V2(spans.iter().map(|s| s.with_tag("seen-by", self.name)).collect())
                }
                other => other,
            }
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl SpanConsumer for FailingStorage {
        async fn accept(&self, _spans: SpanBatch) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("down".to_string()))
        }

        fn schema(&self) -> SchemaVersion {
            SchemaVersion::V2
        }
    }

    fn recording(
        name: &'static str,
        schema: Option<SchemaVersion>,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn SpanDecorator> {
        Arc::new(Recording {
            name,
            schema,
            log: log.clone(),
        })
    }

    fn batch() -> SpanBatch {
        SpanBatch::V2(vec![
            v2::Span::new("0000000000000001", "1"),
            v2::Span::new("0000000000000001", "2"),
        ])
    }

    #[tokio::test]
    async fn test_decorators_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(InMemoryStorage::new(SchemaVersion::V2, 100));
        let collector = SpanCollector::builder(storage.clone())
            .decorator(recording("first", Some(SchemaVersion::V2), &log))
            .decorator(recording("v1-only", Some(SchemaVersion::V1), &log))
            .decorator(recording("second", Some(SchemaVersion::V2), &log))
            .build();

        collector.accept(&RequestInfo::default(), batch()).await.unwrap();

        assert_eq!(log.lock().as_slice(), &["first", "second"]);
        let stored = storage.get_trace("0000000000000001");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].tags.get("seen-by").map(String::as_str), Some("second"));
    }

    #[tokio::test]
    async fn test_decorator_without_schema_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(InMemoryStorage::new(SchemaVersion::V2, 100));
        let collector = SpanCollector::builder(storage)
            .decorator(recording("nothing", None, &log))
            .build();
        assert!(collector.decorator_names().is_empty());
    }

    #[tokio::test]
    async fn test_unsampled_batch_completes_without_decorating() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(InMemoryStorage::new(SchemaVersion::V2, 100));
        let collector = SpanCollector::builder(storage.clone())
            .sampler(CollectorSampler::new(0.0))
            .decorator(recording("first", Some(SchemaVersion::V2), &log))
            .build();

        let (tx, rx) = tokio::sync::oneshot::channel();
        collector
            .accept_spans(&RequestInfo::default(), batch(), OneshotCallback(tx))
            .await;

        assert_eq!(rx.await.unwrap(), Ok(()));
        assert!(log.lock().is_empty());
        assert_eq!(storage.span_count(), 0);
    }

    #[tokio::test]
    async fn test_debug_spans_bypass_sampling() {
        let storage = Arc::new(InMemoryStorage::new(SchemaVersion::V2, 100));
        let collector = SpanCollector::builder(storage.clone())
            .sampler(CollectorSampler::new(0.0))
            .build();

        let mut debug = v2::Span::new("0000000000000001", "1");
        debug.debug = Some(true);
        let spans = SpanBatch::V2(vec![debug, v2::Span::new("0000000000000002", "2")]);
        collector.accept(&RequestInfo::default(), spans).await.unwrap();

        assert_eq!(storage.span_count(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_reaches_callback() {
        let collector = SpanCollector::builder(Arc::new(FailingStorage)).build();

        let outcome = Arc::new(Mutex::new(None));
        let slot = outcome.clone();
        collector
            .accept_spans(&RequestInfo::default(), batch(), move |result: Result<(), StorageError>| {
                *slot.lock() = Some(result);
            })
            .await;

        assert_eq!(
            outcome.lock().clone(),
            Some(Err(StorageError::Unavailable("down".to_string())))
        );
    }
}
