use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::spans::SchemaVersion;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_SPANS,
    DEFAULT_METADATA_LOCAL_DIR, DEFAULT_METADATA_PATH, DEFAULT_METADATA_PORT,
    DEFAULT_METADATA_TIMEOUT_MS, DEFAULT_PORT, DEFAULT_SAMPLE_RATE,
};

// =============================================================================
// Metadata Source Enum
// =============================================================================

/// Where pod metadata is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Per-pod sidecar at `http://<podIP>:<port><path>`
    #[default]
    Remote,
    /// Files in `metadata.local_dir`
    Local,
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataSource::Remote => write!(f, "remote"),
            MetadataSource::Local => write!(f, "local"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Collector configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CollectorFileConfig {
    pub sample_rate: Option<f64>,
    pub max_body_bytes: Option<usize>,
}

/// Storage configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StorageFileConfig {
    pub schema: Option<SchemaVersion>,
    pub max_spans: Option<usize>,
}

/// Decorator configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DecoratorFileConfig {
    pub enabled: Option<bool>,
    pub pass_through: Option<bool>,
    pub verbose: Option<bool>,
    pub tag_enhancer_version: Option<bool>,
    pub metadata_tags: Option<bool>,
}

/// Pod metadata configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetadataFileConfig {
    pub source: Option<MetadataSource>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub timeout_ms: Option<u64>,
    pub local_dir: Option<String>,
    pub cache_max_entries: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub collector: Option<CollectorFileConfig>,
    pub storage: Option<StorageFileConfig>,
    pub decorator: Option<DecoratorFileConfig>,
    pub metadata: Option<MetadataFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `current` with `next` when `next` is set
fn merge_field<T: fmt::Debug>(current: &mut Option<T>, next: Option<T>, name: &str) {
    if next.is_some() {
        tracing::trace!(value = ?next, "Merging {}", name);
        *current = next;
    }
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Names of unknown top-level fields
    fn unknown_fields(&self) -> Vec<String> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_field(&mut current.host, server.host, "server.host");
            merge_field(&mut current.port, server.port, "server.port");
        }

        if let Some(collector) = other.collector {
            let current = self
                .collector
                .get_or_insert_with(CollectorFileConfig::default);
            merge_field(
                &mut current.sample_rate,
                collector.sample_rate,
                "collector.sample_rate",
            );
            merge_field(
                &mut current.max_body_bytes,
                collector.max_body_bytes,
                "collector.max_body_bytes",
            );
        }

        if let Some(storage) = other.storage {
            let current = self.storage.get_or_insert_with(StorageFileConfig::default);
            merge_field(&mut current.schema, storage.schema, "storage.schema");
            merge_field(&mut current.max_spans, storage.max_spans, "storage.max_spans");
        }

        if let Some(decorator) = other.decorator {
            let current = self
                .decorator
                .get_or_insert_with(DecoratorFileConfig::default);
            merge_field(&mut current.enabled, decorator.enabled, "decorator.enabled");
            merge_field(
                &mut current.pass_through,
                decorator.pass_through,
                "decorator.pass_through",
            );
            merge_field(&mut current.verbose, decorator.verbose, "decorator.verbose");
            merge_field(
                &mut current.tag_enhancer_version,
                decorator.tag_enhancer_version,
                "decorator.tag_enhancer_version",
            );
            merge_field(
                &mut current.metadata_tags,
                decorator.metadata_tags,
                "decorator.metadata_tags",
            );
        }

        if let Some(metadata) = other.metadata {
            let current = self
                .metadata
                .get_or_insert_with(MetadataFileConfig::default);
            merge_field(&mut current.source, metadata.source, "metadata.source");
            merge_field(&mut current.port, metadata.port, "metadata.port");
            merge_field(&mut current.path, metadata.path, "metadata.path");
            merge_field(
                &mut current.timeout_ms,
                metadata.timeout_ms,
                "metadata.timeout_ms",
            );
            merge_field(&mut current.local_dir, metadata.local_dir, "metadata.local_dir");
            merge_field(
                &mut current.cache_max_entries,
                metadata.cache_max_entries,
                "metadata.cache_max_entries",
            );
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub sample_rate: f64,
    pub max_body_bytes: usize,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub schema: SchemaVersion,
    pub max_spans: usize,
}

/// Decorator configuration, read once at startup
#[derive(Debug, Clone)]
pub struct DecoratorConfig {
    /// Register the pod-key decorator at all
    pub enabled: bool,
    /// Leave spans untouched (diagnostic bypass)
    pub pass_through: bool,
    /// Collect container/port maps with pod metadata
    pub verbose: bool,
    /// Write `ODX-Enhancer-Version` on enriched spans
    pub tag_enhancer_version: bool,
    /// Write pod metadata fields as tags
    pub metadata_tags: bool,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pass_through: false,
            verbose: false,
            tag_enhancer_version: false,
            metadata_tags: false,
        }
    }
}

/// Pod metadata configuration
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub source: MetadataSource,
    pub port: u16,
    pub path: String,
    pub timeout_ms: u64,
    pub local_dir: PathBuf,
    /// Unbounded when `None`
    pub cache_max_entries: Option<u64>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            source: MetadataSource::default(),
            port: DEFAULT_METADATA_PORT,
            path: DEFAULT_METADATA_PATH.to_string(),
            timeout_ms: DEFAULT_METADATA_TIMEOUT_MS,
            local_dir: PathBuf::from(DEFAULT_METADATA_LOCAL_DIR),
            cache_max_entries: None,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub collector: CollectorConfig,
    pub storage: StorageConfig,
    pub decorator: DecoratorConfig,
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.podtag/podtag.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(file_config, cli);
        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Layer defaults, file config and CLI/env overrides
    fn resolve(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_collector = file_config.collector.unwrap_or_default();
        let file_storage = file_config.storage.unwrap_or_default();
        let file_decorator = file_config.decorator.unwrap_or_default();
        let file_metadata = file_config.metadata.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let collector = CollectorConfig {
            sample_rate: cli
                .sample_rate
                .or(file_collector.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            max_body_bytes: file_collector
                .max_body_bytes
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };

        let storage = StorageConfig {
            schema: cli
                .storage_schema
                .or(file_storage.schema)
                .unwrap_or(SchemaVersion::V2),
            max_spans: file_storage.max_spans.unwrap_or(DEFAULT_MAX_SPANS),
        };

        let defaults = DecoratorConfig::default();
        let decorator = DecoratorConfig {
            enabled: cli
                .decorator_enabled
                .or(file_decorator.enabled)
                .unwrap_or(defaults.enabled),
            pass_through: cli
                .pass_through
                .or(file_decorator.pass_through)
                .unwrap_or(defaults.pass_through),
            verbose: cli
                .verbose
                .or(file_decorator.verbose)
                .unwrap_or(defaults.verbose),
            tag_enhancer_version: file_decorator
                .tag_enhancer_version
                .unwrap_or(defaults.tag_enhancer_version),
            metadata_tags: file_decorator
                .metadata_tags
                .unwrap_or(defaults.metadata_tags),
        };

        let metadata = MetadataConfig {
            source: cli
                .metadata_source
                .or(file_metadata.source)
                .unwrap_or_default(),
            port: cli
                .metadata_port
                .or(file_metadata.port)
                .unwrap_or(DEFAULT_METADATA_PORT),
            path: file_metadata
                .path
                .unwrap_or_else(|| DEFAULT_METADATA_PATH.to_string()),
            timeout_ms: cli
                .metadata_timeout_ms
                .or(file_metadata.timeout_ms)
                .unwrap_or(DEFAULT_METADATA_TIMEOUT_MS),
            local_dir: file_metadata
                .local_dir
                .map(|dir| expand_path(&dir))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_LOCAL_DIR)),
            cache_max_entries: file_metadata.cache_max_entries,
        };

        Self {
            server,
            collector,
            storage,
            decorator,
            metadata,
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port 0 would bind an ephemeral port nobody knows about
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.collector.sample_rate) {
            anyhow::bail!(
                "Configuration error: collector.sample_rate must be between 0.0 and 1.0, got {}",
                self.collector.sample_rate
            );
        }

        // Capacity 0 would reject every non-empty batch
        if self.storage.max_spans == 0 {
            anyhow::bail!("Configuration error: storage.max_spans must be greater than 0");
        }

        if self.metadata.timeout_ms == 0 {
            anyhow::bail!("Configuration error: metadata.timeout_ms must be greater than 0");
        }

        if !self.metadata.path.starts_with('/') {
            anyhow::bail!(
                "Configuration error: metadata.path must start with '/', got '{}'",
                self.metadata.path
            );
        }

        if self.metadata.cache_max_entries == Some(0) {
            tracing::warn!("metadata.cache_max_entries is 0, pod metadata will never be cached");
        }

        if self.decorator.enabled && self.decorator.pass_through {
            tracing::warn!("decorator.pass_through is set, spans will not be enriched");
        }

        if self.collector.sample_rate == 0.0 {
            tracing::warn!("collector.sample_rate is 0, only debug spans will be stored");
        }

        Ok(())
    }
}

/// Get profile config path (~/.podtag/podtag.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_metadata_source_serde() {
        let source: MetadataSource = serde_json::from_str(r#""local""#).unwrap();
        assert_eq!(source, MetadataSource::Local);
        assert_eq!(MetadataSource::Remote.to_string(), "remote");
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = parse(
            r#"{
                "server": { "host": "0.0.0.0", "port": 9412 },
                "collector": { "sample_rate": 0.5, "max_body_bytes": 1024 },
                "storage": { "schema": "v1", "max_spans": 10 },
                "decorator": { "pass_through": true, "verbose": true, "metadata_tags": true },
                "metadata": { "source": "local", "port": 8080, "path": "/meta", "timeout_ms": 500 }
            }"#,
        );

        assert_eq!(config.server.as_ref().unwrap().port, Some(9412));
        assert_eq!(config.collector.as_ref().unwrap().sample_rate, Some(0.5));
        assert_eq!(
            config.storage.as_ref().unwrap().schema,
            Some(SchemaVersion::V1)
        );
        assert_eq!(config.decorator.as_ref().unwrap().pass_through, Some(true));
        assert_eq!(
            config.metadata.as_ref().unwrap().source,
            Some(MetadataSource::Local)
        );
        assert!(config.unknown_fields().is_empty());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let config = parse(r#"{ "server": { "host": "localhost" }, "decorators": {} }"#);
        assert_eq!(config.unknown_fields(), vec!["decorators".to_string()]);
    }

    #[test]
    fn test_merge_other_takes_precedence() {
        let mut base = parse(r#"{ "server": { "host": "a", "port": 1 }, "decorator": { "verbose": true } }"#);
        base.merge(parse(r#"{ "server": { "port": 2 }, "decorator": { "pass_through": true } }"#));

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("a"));
        assert_eq!(server.port, Some(2));
        let decorator = base.decorator.unwrap();
        assert_eq!(decorator.verbose, Some(true));
        assert_eq!(decorator.pass_through, Some(true));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(FileConfig::default(), &CliConfig::default());
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.collector.sample_rate, 1.0);
        assert_eq!(config.storage.schema, SchemaVersion::V2);
        assert!(config.decorator.enabled);
        assert!(!config.decorator.pass_through);
        assert!(!config.decorator.tag_enhancer_version);
        assert_eq!(config.metadata.port, 9411);
        assert_eq!(config.metadata.path, "/podinfo");
        assert_eq!(config.metadata.timeout_ms, 2_000);
        assert!(config.metadata.cache_max_entries.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file = parse(r#"{ "server": { "port": 9000 }, "decorator": { "pass_through": true } }"#);
        let cli = CliConfig {
            port: Some(9100),
            pass_through: Some(false),
            ..Default::default()
        };
        let config = AppConfig::resolve(file, &cli);
        assert_eq!(config.server.port, 9100);
        assert!(!config.decorator.pass_through);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            r#"{ "server": { "host": "" } }"#,
            r#"{ "server": { "port": 0 } }"#,
            r#"{ "collector": { "sample_rate": 1.5 } }"#,
            r#"{ "collector": { "sample_rate": -0.1 } }"#,
            r#"{ "metadata": { "timeout_ms": 0 } }"#,
            r#"{ "storage": { "max_spans": 0 } }"#,
            r#"{ "metadata": { "path": "podinfo" } }"#,
        ];
        for json in cases {
            let config = AppConfig::resolve(parse(json), &CliConfig::default());
            assert!(config.validate().is_err(), "expected {} to fail", json);
        }
    }

    #[test]
    fn test_load_from_cli_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{ "storage": { "schema": "v1" } }"#).unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.storage.schema, SchemaVersion::V1);
    }

    #[test]
    fn test_load_missing_config_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/podtag.json")),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }
}
