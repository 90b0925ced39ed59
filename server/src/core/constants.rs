// =============================================================================
// Application Identity
// =============================================================================

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".podtag";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "podtag.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "PODTAG_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "PODTAG_LOG";

/// Default log filter when neither PODTAG_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,podtag=info,podtag_server=info";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "PODTAG_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "PODTAG_PORT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port (standard Zipkin collector port)
pub const DEFAULT_PORT: u16 = 9411;

// =============================================================================
// Collector
// =============================================================================

/// Environment variable for the collector sample rate
pub const ENV_SAMPLE_RATE: &str = "PODTAG_SAMPLE_RATE";

/// Default sample rate (keep everything)
pub const DEFAULT_SAMPLE_RATE: f64 = 1.0;

/// Default body limit for span ingestion (16 MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// Storage
// =============================================================================

/// Environment variable for the storage span schema (v1 or v2)
pub const ENV_STORAGE_SCHEMA: &str = "PODTAG_STORAGE_SCHEMA";

/// Default number of spans retained by the in-memory store
pub const DEFAULT_MAX_SPANS: usize = 500_000;

// =============================================================================
// Decorator
// =============================================================================

/// Environment variable to disable the decorator chain
pub const ENV_DECORATOR_ENABLED: &str = "PODTAG_DECORATOR_ENABLED";

/// Environment variable to pass spans through unmodified
pub const ENV_PASS_THROUGH: &str = "PODTAG_PASS_THROUGH";

/// Environment variable to include container maps in pod metadata
pub const ENV_VERBOSE: &str = "PODTAG_VERBOSE";

/// Request header carrying the pod key (lowercase, matched case-insensitively)
pub const POD_KEY_HEADER: &str = "x-odx-podkey";

/// Tag holding the pod key
pub const TAG_POD_KEY: &str = "ODX-Pod-Key";

/// Tag holding the enhancer version
pub const TAG_ENHANCER_VERSION: &str = "ODX-Enhancer-Version";

/// Version stamped on resolved pod metadata
pub const ENHANCER_VERSION: &str = "0.3-rs";

pub const TAG_POD_NAMESPACE: &str = "podNamespace";
pub const TAG_POD_NAME: &str = "podName";
pub const TAG_POD_IP: &str = "podIP";
pub const TAG_CONTAINER_NAME_ID_MAP: &str = "containerNameIdMap";
pub const TAG_CONTAINER_PORT_NAME_MAP: &str = "containerPortNameMap";

// =============================================================================
// Pod Metadata Service
// =============================================================================

/// Environment variable for the metadata source (remote or local)
pub const ENV_METADATA_SOURCE: &str = "PODTAG_METADATA_SOURCE";

/// Environment variable for the metadata service port
pub const ENV_METADATA_PORT: &str = "PODTAG_METADATA_PORT";

/// Environment variable for the metadata request timeout in milliseconds
pub const ENV_METADATA_TIMEOUT_MS: &str = "PODTAG_METADATA_TIMEOUT_MS";

/// Port the per-pod metadata sidecar listens on
pub const DEFAULT_METADATA_PORT: u16 = 9411;

/// Path prefix of the metadata sidecar
pub const DEFAULT_METADATA_PATH: &str = "/podinfo";

/// Default metadata request timeout (2 seconds)
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 2_000;

/// Default directory for local metadata files
pub const DEFAULT_METADATA_LOCAL_DIR: &str = ".";

/// Container description document
pub const CONTAINER_METADATA_FILE: &str = "container-metadata.json";

/// Flat pod properties document
pub const POD_PROPERTIES_FILE: &str = "pod-metadata.properties";

pub const PROP_POD_NAMESPACE: &str = "MY_POD_NAMESPACE";
pub const PROP_POD_NAME: &str = "MY_POD_NAME";
pub const PROP_POD_IP: &str = "MY_POD_IP";
