//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::{AppConfig, MetadataConfig};
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::pods::{HttpMetadataFetcher, MetadataCache};
use crate::data::storage::InMemoryStorage;
use crate::domain::collector::{CollectorSampler, SpanCollector};
use crate::domain::decorator::PodKeyDecorator;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: Arc<InMemoryStorage>,
    pub cache: Arc<MetadataCache>,
    pub collector: Arc<SpanCollector>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Inspect { pod_keys }) => {
                return Self::inspect(&cli_config, &pod_keys).await;
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Self::from_config(config)
    }

    /// Wire storage, metadata cache, decorator and collector from a resolved config
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let storage = Arc::new(InMemoryStorage::new(
            config.storage.schema,
            config.storage.max_spans,
        ));
        let cache = Self::metadata_cache(&config.metadata)?;

        let mut builder = SpanCollector::builder(storage.clone())
            .sampler(CollectorSampler::new(config.collector.sample_rate));
        if config.decorator.enabled {
            builder = builder.decorator(Arc::new(PodKeyDecorator::new(
                config.storage.schema,
                config.decorator.clone(),
                Some(cache.clone()),
            )));
        } else {
            tracing::debug!("Pod-key decorator disabled by config");
        }
        let collector = Arc::new(builder.build());

        let shutdown = ShutdownService::new(storage.clone());

        Ok(Self {
            shutdown,
            config,
            storage,
            cache,
            collector,
        })
    }

    fn metadata_cache(config: &MetadataConfig) -> Result<Arc<MetadataCache>> {
        let fetcher = HttpMetadataFetcher::new(
            Duration::from_millis(config.timeout_ms),
            config.local_dir.clone(),
        )
        .context("Failed to build metadata client")?;
        tracing::debug!(
            source = %config.source,
            port = config.port,
            path = %config.path,
            "Metadata cache initialized"
        );
        Ok(Arc::new(MetadataCache::new(config, Arc::new(fetcher))))
    }

    /// Resolve pod keys through the configured metadata source and print
    /// the results as JSON
    async fn inspect(cli: &CliConfig, pod_keys: &[String]) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let cache = Self::metadata_cache(&config.metadata)?;

        let mut resolved = Vec::with_capacity(pod_keys.len());
        for pod_key in pod_keys {
            resolved.push(cache.get_metadata(pod_key, config.decorator.verbose).await);
        }

        println!("{}", serde_json::to_string_pretty(&resolved)?);
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Signal handlers go in before the listener binds
        app.shutdown.install_signal_handlers();

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        tracing::info!(
            spans = app.storage.span_count(),
            traces = app.storage.trace_count(),
            "Collector stopped"
        );
        Ok(())
    }
}
