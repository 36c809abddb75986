use serde::Deserialize;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Remote catalog API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint template with an `{id}` placeholder,
    /// e.g. "https://api.example.com/v1/products/{id}"
    #[serde(rename = "endpoint-template")]
    pub endpoint_template: String,

    /// User agent string sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Fetch behavior configuration: retry budget, backoff and concurrency
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum attempts per identifier before a transient failure
    /// is escalated to retry-exhausted
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay (milliseconds); doubles on each further attempt
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on a single retry delay (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Random jitter added to each delay (milliseconds, 0 disables)
    #[serde(rename = "backoff-jitter-ms", default = "default_backoff_jitter_ms")]
    pub backoff_jitter_ms: u64,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of identifiers fetched concurrently
    #[serde(rename = "max-in-flight", default = "default_max_in_flight")]
    pub max_in_flight: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_jitter_ms: default_backoff_jitter_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Identifier list input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the identifier list (CSV/TSV, identifiers in the first column)
    #[serde(rename = "identifier-file")]
    pub identifier_file: String,

    /// Whether the first row of the identifier file is a header
    #[serde(rename = "has-header", default)]
    pub has_header: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the tab-separated results file
    #[serde(rename = "results-path")]
    pub results_path: String,

    /// Path to the failure log
    #[serde(rename = "failure-log-path")]
    pub failure_log_path: String,

    /// Path to the SQLite progress ledger
    #[serde(rename = "ledger-path")]
    pub ledger_path: String,
}

fn default_user_agent() -> String {
    format!("catalog-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_jitter_ms() -> u64 {
    250
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_in_flight() -> u32 {
    8
}
