//! Tag enrichment primitive
//!
//! Builds the tag set for one request from a resolved pod, then applies it
//! to canonical (v2) spans. Only tags change: ids, timing and annotations
//! are carried over as-is.

use std::collections::BTreeMap;

use crate::core::config::DecoratorConfig;
use crate::core::constants::{
    TAG_CONTAINER_NAME_ID_MAP, TAG_CONTAINER_PORT_NAME_MAP, TAG_ENHANCER_VERSION, TAG_POD_IP,
    TAG_POD_KEY, TAG_POD_NAME, TAG_POD_NAMESPACE,
};
use crate::data::pods::ResolvedPod;
use crate::domain::spans::v2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    tags: BTreeMap<String, String>,
}

impl Enrichment {
    pub fn from_resolved(resolved: &ResolvedPod, config: &DecoratorConfig) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_POD_KEY.to_string(), resolved.pod_key.clone());

        if config.tag_enhancer_version {
            tags.insert(
                TAG_ENHANCER_VERSION.to_string(),
                resolved.enhancer_version.to_string(),
            );
        }

        if config.metadata_tags {
            let metadata = &resolved.metadata;
            let scalars = [
                (TAG_POD_NAMESPACE, &metadata.namespace),
                (TAG_POD_NAME, &metadata.name),
                (TAG_POD_IP, &metadata.ip),
            ];
            for (key, value) in scalars {
                if let Some(value) = value {
                    tags.insert(key.to_string(), value.clone());
                }
            }

            if config.verbose
                && let Some(containers) = &metadata.containers
            {
                if let Ok(json) = serde_json::to_string(&containers.name_to_id) {
                    tags.insert(TAG_CONTAINER_NAME_ID_MAP.to_string(), json);
                }
                if let Ok(json) = serde_json::to_string(&containers.port_to_name) {
                    tags.insert(TAG_CONTAINER_PORT_NAME_MAP.to_string(), json);
                }
            }
        }

        Self { tags }
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Copy of `span` carrying this enrichment's tags
    pub fn apply(&self, span: &v2::Span) -> v2::Span {
        let mut enriched = span.clone();
        for (key, value) in &self.tags {
            enriched.tags.insert(key.clone(), value.clone());
        }
        enriched
    }
}
