//! Pod-key decorator
//!
//! Tags every span of a request with the pod key carried in the
//! `x-odx-podkey` header, plus pod metadata when configured. One instance
//! serves one schema version:
//! - v2 batches are enriched span by span, order and size preserved
//! - v1 batches go through v2: each span is split into its v2 spans,
//!   enriched, converted back and flattened, so the output may be longer
//!   than the input

use std::sync::Arc;

use async_trait::async_trait;

use super::enrich::Enrichment;
use super::{RequestInfo, SpanDecorator};
use crate::core::config::DecoratorConfig;
use crate::core::constants::ENHANCER_VERSION;
use crate::data::pods::{MetadataCache, PodKey, PodMetadata, ResolvedPod};
use crate::domain::spans::{SchemaVersion, SpanBatch, convert};

pub struct PodKeyDecorator {
    schema: SchemaVersion,
    config: DecoratorConfig,
    cache: Option<Arc<MetadataCache>>,
}

impl PodKeyDecorator {
    pub fn v1(config: DecoratorConfig, cache: Option<Arc<MetadataCache>>) -> Self {
        Self::new(SchemaVersion::V1, config, cache)
    }

    pub fn v2(config: DecoratorConfig, cache: Option<Arc<MetadataCache>>) -> Self {
        Self::new(SchemaVersion::V2, config, cache)
    }

    pub fn new(
        schema: SchemaVersion,
        config: DecoratorConfig,
        cache: Option<Arc<MetadataCache>>,
    ) -> Self {
        if config.metadata_tags && cache.is_none() {
            tracing::warn!("decorator.metadata_tags is set without a metadata cache, only the pod key will be tagged");
        }
        Self {
            schema,
            config,
            cache,
        }
    }

    async fn resolve(&self, key: &PodKey) -> ResolvedPod {
        match (&self.cache, self.config.metadata_tags) {
            (Some(cache), true) => cache.get(key, self.config.verbose).await,
            _ => ResolvedPod {
                pod_key: key.to_string(),
                enhancer_version: ENHANCER_VERSION,
                metadata: PodMetadata::default(),
            },
        }
    }

    fn enhance(enrichment: &Enrichment, spans: SpanBatch) -> SpanBatch {
        match spans {
            SpanBatch::V2(spans) => SpanBatch::V2(spans.iter().map(|s| enrichment.apply(s)).collect()),
            SpanBatch::V1(spans) => SpanBatch::V1(
                spans
                    .iter()
                    .flat_map(convert::from_v1)
                    .map(|s| convert::to_v1(&enrichment.apply(&s)))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SpanDecorator for PodKeyDecorator {
    fn name(&self) -> &'static str {
        match self.schema {
            SchemaVersion::V1 => "pod-key-v1",
            SchemaVersion::V2 => "pod-key-v2",
        }
    }

    fn supports_schema(&self, version: SchemaVersion) -> bool {
        version == self.schema
    }

    async fn decorate(&self, request: &RequestInfo, spans: SpanBatch) -> SpanBatch {
        if spans.version() != self.schema {
            tracing::debug!(
                decorator = self.name(),
                schema = %spans.version(),
                "Unsupported span schema, skipping"
            );
            return spans;
        }

        tracing::trace!(decorator = self.name(), input = ?spans, "Input spans");

        if self.config.pass_through {
            tracing::debug!(decorator = self.name(), "Pass-through mode, skipping span enhancement");
            return spans;
        }

        let Some(raw_key) = request.pod_key() else {
            tracing::debug!(decorator = self.name(), "No pod key found, skipping span enhancement");
            return spans;
        };

        let key = match PodKey::parse(raw_key) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(pod_key = raw_key, error = %e, "Invalid pod key, skipping span enhancement");
                return spans;
            }
        };

        let resolved = self.resolve(&key).await;
        let enrichment = Enrichment::from_resolved(&resolved, &self.config);

        let input_len = spans.len();
        let enhanced = Self::enhance(&enrichment, spans);
        tracing::debug!(
            decorator = self.name(),
            pod_key = %key,
            input = input_len,
            output = enhanced.len(),
            "Enhanced spans"
        );
        tracing::trace!(decorator = self.name(), output = ?enhanced, "Output spans");
        enhanced
    }
}
