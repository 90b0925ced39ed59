//! In-memory span store
//!
//! Keeps v2 spans grouped by trace id. When the span count exceeds the
//! capacity, whole traces are evicted oldest first.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SpanConsumer, StorageError};
use crate::domain::spans::{SchemaVersion, SpanBatch, v2};

#[derive(Debug, Default)]
struct Traces {
    by_id: HashMap<String, Vec<v2::Span>>,
    /// Trace ids in first-seen order
    order: VecDeque<String>,
    span_count: usize,
}

#[derive(Debug)]
pub struct InMemoryStorage {
    schema: SchemaVersion,
    max_spans: usize,
    traces: Mutex<Traces>,
    closed: AtomicBool,
}

impl InMemoryStorage {
    pub fn new(schema: SchemaVersion, max_spans: usize) -> Self {
        Self {
            schema,
            max_spans,
            traces: Mutex::new(Traces::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Spans stored for `trace_id`, in arrival order
    pub fn get_trace(&self, trace_id: &str) -> Vec<v2::Span> {
        let trace_id = trace_id.to_ascii_lowercase();
        self.traces
            .lock()
            .by_id
            .get(&trace_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn span_count(&self) -> usize {
        self.traces.lock().span_count
    }

    pub fn trace_count(&self) -> usize {
        self.traces.lock().by_id.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting spans
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(spans = self.span_count(), "In-memory storage closed");
    }
}

#[async_trait]
impl SpanConsumer for InMemoryStorage {
    async fn accept(&self, spans: SpanBatch) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Unavailable("storage is closed".to_string()));
        }

        let spans = spans.into_v2();
        if spans.len() > self.max_spans {
            return Err(StorageError::Rejected(format!(
                "batch of {} spans exceeds capacity {}",
                spans.len(),
                self.max_spans
            )));
        }

        let mut guard = self.traces.lock();
        let traces = &mut *guard;
        for span in spans {
            let trace_id = span.trace_id.to_ascii_lowercase();
            match traces.by_id.get_mut(&trace_id) {
                Some(existing) => existing.push(span),
                None => {
                    traces.order.push_back(trace_id.clone());
                    traces.by_id.insert(trace_id, vec![span]);
                }
            }
            traces.span_count += 1;
        }

        let mut evicted = 0usize;
        while traces.span_count > self.max_spans {
            let Some(oldest) = traces.order.pop_front() else {
                break;
            };
            if let Some(removed) = traces.by_id.remove(&oldest) {
                traces.span_count -= removed.len();
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, spans = traces.span_count, "Evicted oldest traces");
        }

        Ok(())
    }

    fn schema(&self) -> SchemaVersion {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spans::v1;

    fn span(trace_id: &str, id: &str) -> v2::Span {
        v2::Span::new(trace_id, id)
    }

    #[tokio::test]
    async fn test_accept_groups_by_trace() {
        let storage = InMemoryStorage::new(SchemaVersion::V2, 100);
        storage
            .accept(SpanBatch::V2(vec![span("aa", "1"), span("bb", "2"), span("AA", "3")]))
            .await
            .unwrap();

        assert_eq!(storage.span_count(), 3);
        assert_eq!(storage.trace_count(), 2);
        let trace = storage.get_trace("aa");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].id, "3");
        assert!(storage.get_trace("cc").is_empty());
    }

    #[tokio::test]
    async fn test_accept_converts_v1() {
        let storage = InMemoryStorage::new(SchemaVersion::V1, 100);
        assert_eq!(storage.schema(), SchemaVersion::V1);
        storage
            .accept(SpanBatch::V1(vec![v1::Span::new("aa", "1")]))
            .await
            .unwrap();
        assert_eq!(storage.get_trace("aa")[0].id, "1");
    }

    #[tokio::test]
    async fn test_evicts_oldest_traces() {
        let storage = InMemoryStorage::new(SchemaVersion::V2, 3);
        storage
            .accept(SpanBatch::V2(vec![span("aa", "1"), span("aa", "2")]))
            .await
            .unwrap();
        storage
            .accept(SpanBatch::V2(vec![span("bb", "3"), span("cc", "4")]))
            .await
            .unwrap();

        assert!(storage.get_trace("aa").is_empty());
        assert_eq!(storage.span_count(), 2);
        assert_eq!(storage.get_trace("cc").len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_oversized_batch() {
        let storage = InMemoryStorage::new(SchemaVersion::V2, 1);
        let result = storage
            .accept(SpanBatch::V2(vec![span("aa", "1"), span("aa", "2")]))
            .await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert_eq!(storage.span_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_storage_is_unavailable() {
        let storage = InMemoryStorage::new(SchemaVersion::V2, 10);
        storage.close();
        let result = storage.accept(SpanBatch::V2(vec![span("aa", "1")])).await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }
}
