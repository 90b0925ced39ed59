use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::MetadataSource;
use super::constants::{
    ENV_CONFIG, ENV_DECORATOR_ENABLED, ENV_HOST, ENV_METADATA_PORT, ENV_METADATA_SOURCE,
    ENV_METADATA_TIMEOUT_MS, ENV_PASS_THROUGH, ENV_PORT, ENV_SAMPLE_RATE, ENV_STORAGE_SCHEMA,
    ENV_VERBOSE,
};
use crate::domain::spans::SchemaVersion;

#[derive(Parser)]
#[command(name = "podtag")]
#[command(version, about = "Trace collector that tags spans with pod metadata", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Fraction of traces to keep (0.0 - 1.0)
    #[arg(long, global = true, env = ENV_SAMPLE_RATE)]
    pub sample_rate: Option<f64>,

    /// Span schema the storage accepts (v1 or v2)
    #[arg(long, global = true, env = ENV_STORAGE_SCHEMA, value_parser = parse_schema_version)]
    pub storage_schema: Option<SchemaVersion>,

    /// Enable or disable the pod-key decorator
    #[arg(long, global = true, env = ENV_DECORATOR_ENABLED)]
    pub decorator_enabled: Option<bool>,

    /// Pass spans through without enrichment
    #[arg(long, global = true, env = ENV_PASS_THROUGH)]
    pub pass_through: Option<bool>,

    /// Include container/port maps in pod metadata
    #[arg(long, global = true, env = ENV_VERBOSE)]
    pub verbose: Option<bool>,

    /// Pod metadata source (remote or local)
    #[arg(long, global = true, env = ENV_METADATA_SOURCE, value_parser = parse_metadata_source)]
    pub metadata_source: Option<MetadataSource>,

    /// Pod metadata sidecar port
    #[arg(long, global = true, env = ENV_METADATA_PORT)]
    pub metadata_port: Option<u16>,

    /// Pod metadata request timeout in milliseconds
    #[arg(long, global = true, env = ENV_METADATA_TIMEOUT_MS)]
    pub metadata_timeout_ms: Option<u64>,
}

/// Parse span schema version from CLI/env string
fn parse_schema_version(s: &str) -> Result<SchemaVersion, String> {
    s.parse::<SchemaVersion>()
        .map_err(|_| format!("Invalid span schema '{}'. Valid options: v1, v2", s))
}

/// Parse metadata source from CLI/env string
fn parse_metadata_source(s: &str) -> Result<MetadataSource, String> {
    match s.to_lowercase().as_str() {
        "remote" => Ok(MetadataSource::Remote),
        "local" => Ok(MetadataSource::Local),
        _ => Err(format!(
            "Invalid metadata source '{}'. Valid options: remote, local",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the collector (default command)
    Start,
    /// Resolve pod metadata for the given pod keys and print it
    Inspect {
        /// Pod keys in `node:pod:ip` form
        #[arg(required = true)]
        pod_keys: Vec<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub sample_rate: Option<f64>,
    pub storage_schema: Option<SchemaVersion>,
    pub decorator_enabled: Option<bool>,
    pub pass_through: Option<bool>,
    pub verbose: Option<bool>,
    pub metadata_source: Option<MetadataSource>,
    pub metadata_port: Option<u16>,
    pub metadata_timeout_ms: Option<u64>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        sample_rate: cli.sample_rate,
        storage_schema: cli.storage_schema,
        decorator_enabled: cli.decorator_enabled,
        pass_through: cli.pass_through,
        verbose: cli.verbose,
        metadata_source: cli.metadata_source,
        metadata_port: cli.metadata_port,
        metadata_timeout_ms: cli.metadata_timeout_ms,
    };
    (config, cli.command)
}
