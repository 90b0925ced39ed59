//! Pod metadata cache
//!
//! Maps pod keys to fetched metadata. Population goes through moka's
//! `optionally_get_with`, so concurrent lookups of one key share a single
//! fetch. Only non-empty results are stored: when every sub-fetch failed the
//! caller gets the empty record and the next lookup fetches again.
//!
//! Entries never expire. Without `metadata.cache_max_entries` the cache grows
//! with the number of distinct pods seen over the process lifetime.

use std::sync::Arc;

use moka::future::Cache;

use super::fetcher::MetadataFetcher;
use super::types::{ContainerDetails, PodKey, PodMetadata, ResolvedPod};
use crate::core::config::{MetadataConfig, MetadataSource};
use crate::core::constants::ENHANCER_VERSION;

pub struct MetadataCache {
    cache: Cache<String, PodMetadata>,
    fetcher: Arc<dyn MetadataFetcher>,
    source: MetadataSource,
    port: u16,
    path: String,
}

impl MetadataCache {
    pub fn new(config: &MetadataConfig, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        let mut builder = Cache::builder();
        if let Some(max) = config.cache_max_entries {
            builder = builder.max_capacity(max);
        }
        tracing::debug!(
            source = %config.source,
            fetcher = fetcher.name(),
            max_entries = ?config.cache_max_entries,
            "Pod metadata cache initialized"
        );
        Self {
            cache: builder.build(),
            fetcher,
            source: config.source,
            port: config.port,
            path: config.path.clone(),
        }
    }

    /// Sidecar URL for a pod, `None` when reading local files
    pub fn base_url(&self, key: &PodKey) -> Option<String> {
        match self.source {
            MetadataSource::Remote => Some(format!(
                "http://{}:{}{}",
                key.pod_ip(),
                self.port,
                self.path
            )),
            MetadataSource::Local => None,
        }
    }

    /// Resolve metadata for a validated pod key
    pub async fn get(&self, key: &PodKey, verbose: bool) -> ResolvedPod {
        let metadata = match self.cache.get(key.as_str()).await {
            Some(hit) => {
                tracing::trace!(pod_key = %key, "Pod metadata cache hit");
                hit
            }
            None => {
                tracing::debug!(pod_key = %key, "Pod metadata cache miss");
                let base_url = self.base_url(key);
                let fetched = self
                    .cache
                    .optionally_get_with(key.as_str().to_string(), async {
                        let metadata = self.fetcher.fetch(base_url.as_deref(), verbose).await;
                        if metadata.is_empty() {
                            tracing::debug!(pod_key = %key, "Empty pod metadata, not caching");
                            None
                        } else {
                            Some(metadata)
                        }
                    })
                    .await;
                fetched.unwrap_or_else(|| PodMetadata {
                    containers: verbose.then(ContainerDetails::default),
                    ..Default::default()
                })
            }
        };

        ResolvedPod {
            pod_key: key.to_string(),
            enhancer_version: ENHANCER_VERSION,
            metadata,
        }
    }

    /// Resolve metadata for a raw pod key string
    ///
    /// A malformed key is logged and yields an empty record; neither the
    /// cache nor the fetcher is touched.
    pub async fn get_metadata(&self, pod_key: &str, verbose: bool) -> ResolvedPod {
        match PodKey::parse(pod_key) {
            Ok(key) => self.get(&key, verbose).await,
            Err(e) => {
                tracing::warn!(pod_key, error = %e, "Invalid pod key");
                ResolvedPod {
                    pod_key: pod_key.to_string(),
                    enhancer_version: ENHANCER_VERSION,
                    metadata: PodMetadata::default(),
                }
            }
        }
    }

    pub fn contains(&self, pod_key: &str) -> bool {
        self.cache.contains_key(pod_key)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher that records its calls and returns a canned record
    pub(crate) struct CountingFetcher {
        pub calls: AtomicUsize,
        pub urls: Mutex<Vec<Option<String>>>,
        pub result: PodMetadata,
        pub delay: Duration,
    }

    impl CountingFetcher {
        pub fn new(result: PodMetadata) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
                result,
                delay: Duration::ZERO,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataFetcher for CountingFetcher {
        async fn fetch(&self, base_url: Option<&str>, _verbose: bool) -> PodMetadata {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(base_url.map(str::to_string));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    pub(crate) fn pod1_metadata() -> PodMetadata {
        PodMetadata {
            namespace: Some("ns1".to_string()),
            name: Some("pod1".to_string()),
            ip: Some("10.0.0.5".to_string()),
            containers: None,
        }
    }

    fn cache_with(fetcher: Arc<CountingFetcher>, config: &MetadataConfig) -> MetadataCache {
        MetadataCache::new(config, fetcher)
    }

    #[tokio::test]
    async fn test_sequential_lookups_fetch_once() {
        let fetcher = Arc::new(CountingFetcher::new(pod1_metadata()));
        let cache = cache_with(fetcher.clone(), &MetadataConfig::default());

        let first = cache.get_metadata("nodeA:pod1:10.0.0.5", false).await;
        let second = cache.get_metadata("nodeA:pod1:10.0.0.5", false).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first.pod_key, "nodeA:pod1:10.0.0.5");
        assert_eq!(first.enhancer_version, ENHANCER_VERSION);
        assert_eq!(first.metadata, pod1_metadata());
        assert!(cache.contains("nodeA:pod1:10.0.0.5"));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_fetch_once() {
        let mut fetcher = CountingFetcher::new(pod1_metadata());
        fetcher.delay = Duration::from_millis(50);
        let fetcher = Arc::new(fetcher);
        let cache = Arc::new(cache_with(fetcher.clone(), &MetadataConfig::default()));

        let lookups = (0..16).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_metadata("nodeB:pod2:10.0.0.6", true).await })
        });
        let results = futures::future::join_all(lookups).await;

        assert_eq!(fetcher.calls(), 1);
        for result in results {
            assert_eq!(result.unwrap().metadata, pod1_metadata());
        }
    }

    #[tokio::test]
    async fn test_malformed_key_skips_fetch() {
        let fetcher = Arc::new(CountingFetcher::new(pod1_metadata()));
        let cache = cache_with(fetcher.clone(), &MetadataConfig::default());

        let resolved = cache.get_metadata("badkey", false).await;
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(resolved.pod_key, "badkey");
        assert_eq!(resolved.enhancer_version, ENHANCER_VERSION);
        assert!(resolved.metadata.is_empty());
        assert!(!cache.contains("badkey"));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let fetcher = Arc::new(CountingFetcher::new(PodMetadata::default()));
        let cache = cache_with(fetcher.clone(), &MetadataConfig::default());

        let first = cache.get_metadata("nodeA:pod1:10.0.0.5", true).await;
        assert!(first.metadata.is_empty());
        assert_eq!(first.metadata.containers, Some(ContainerDetails::default()));
        cache.get_metadata("nodeA:pod1:10.0.0.5", true).await;

        assert_eq!(fetcher.calls(), 2);
        assert!(!cache.contains("nodeA:pod1:10.0.0.5"));
    }

    #[tokio::test]
    async fn test_remote_base_url() {
        let fetcher = Arc::new(CountingFetcher::new(pod1_metadata()));
        let cache = cache_with(fetcher.clone(), &MetadataConfig::default());

        cache.get_metadata("nodeA:pod1:10.0.0.5", false).await;
        assert_eq!(
            fetcher.urls.lock().as_slice(),
            &[Some("http://10.0.0.5:9411/podinfo".to_string())]
        );
    }

    #[tokio::test]
    async fn test_local_source_passes_no_url() {
        let fetcher = Arc::new(CountingFetcher::new(pod1_metadata()));
        let config = MetadataConfig {
            source: MetadataSource::Local,
            ..Default::default()
        };
        let cache = cache_with(fetcher.clone(), &config);

        cache.get_metadata("nodeA:pod1:10.0.0.5", false).await;
        assert_eq!(fetcher.urls.lock().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_separately() {
        let fetcher = Arc::new(CountingFetcher::new(pod1_metadata()));
        let cache = cache_with(fetcher.clone(), &MetadataConfig::default());

        cache.get_metadata("nodeA:pod1:10.0.0.5", false).await;
        cache.get_metadata("nodeA:pod2:10.0.0.6", false).await;
        assert_eq!(fetcher.calls(), 2);
    }
}
