//! Configuration management for WebRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values (every field has one, so an empty environment loads)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// External search service connection
    #[serde(default)]
    pub search_service: SearchServiceConfig,

    /// Query-time fusion tunables
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Batch authority computation
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Query history log
    #[serde(default)]
    pub history: HistoryConfig,

    /// Registered users
    #[serde(default)]
    pub users: UserStoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchServiceConfig {
    /// Base URL of the search service
    #[serde(default = "default_service_url")]
    pub url: String,

    /// Index holding the ranked pages
    #[serde(default = "default_index")]
    pub index: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Per-request timeout for bulk uploads in seconds
    #[serde(default = "default_bulk_timeout")]
    pub bulk_timeout_secs: u64,

    /// How long startup keeps retrying the initial ping
    #[serde(default = "default_connect_retry")]
    pub connect_retry_secs: u64,

    /// Concurrent bulk requests during upload
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Weight of normalized relevance in the final score
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,

    /// Weight of normalized authority in the final score
    #[serde(default = "default_authority_weight")]
    pub authority_weight: f64,

    /// Extra weight for candidates containing a history term
    #[serde(default = "default_history_boost")]
    pub history_boost: f64,

    /// Stored field holding each page's authority
    #[serde(default = "default_authority_field")]
    pub authority_field: String,

    /// Modifier applied to the authority field inside the service query
    #[serde(default = "default_authority_modifier")]
    pub authority_modifier: String,

    /// Candidates requested per query
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Snippet length returned to callers
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Snippet length written to the history log
    #[serde(default = "default_log_snippet_chars")]
    pub log_snippet_chars: usize,

    /// Completion suggestions per prefix
    #[serde(default = "default_suggest_size")]
    pub suggest_size: usize,

    /// Fuzziness passed to the completion endpoint
    #[serde(default = "default_suggest_fuzziness")]
    pub suggest_fuzziness: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityConfig {
    /// Damping factor (probability of following a link)
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// L1 convergence tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Run the per-node update on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Append-only query log path
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserStoreConfig {
    /// JSON file mapping usernames to password hashes
    #[serde(default = "default_users_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive (debug, info, webrank_search=trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name attached to log lines
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_service_url() -> String { "http://localhost:9200".to_string() }
fn default_index() -> String { "webrank".to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_bulk_timeout() -> u64 { 60 }
fn default_connect_retry() -> u64 { 15 }
fn default_bulk_concurrency() -> usize { 4 }
fn default_relevance_weight() -> f64 { 0.7 }
fn default_authority_weight() -> f64 { 0.3 }
fn default_history_boost() -> f64 { 1.5 }
fn default_authority_field() -> String { "pagerank".to_string() }
fn default_authority_modifier() -> String { "sqrt".to_string() }
fn default_result_limit() -> usize { 4 }
fn default_snippet_chars() -> usize { 200 }
fn default_log_snippet_chars() -> usize { 100 }
fn default_suggest_size() -> usize { 5 }
fn default_suggest_fuzziness() -> String { "AUTO".to_string() }
fn default_damping() -> f64 { 0.85 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_max_iterations() -> usize { 100 }
fn default_parallel() -> bool { true }
fn default_history_path() -> PathBuf { PathBuf::from("history.txt") }
fn default_users_path() -> PathBuf { PathBuf::from("users.json") }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "webrank".to_string() }

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            index: default_index(),
            request_timeout_secs: default_request_timeout(),
            bulk_timeout_secs: default_bulk_timeout(),
            connect_retry_secs: default_connect_retry(),
            bulk_concurrency: default_bulk_concurrency(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            relevance_weight: default_relevance_weight(),
            authority_weight: default_authority_weight(),
            history_boost: default_history_boost(),
            authority_field: default_authority_field(),
            authority_modifier: default_authority_modifier(),
            result_limit: default_result_limit(),
            snippet_chars: default_snippet_chars(),
            log_snippet_chars: default_log_snippet_chars(),
            suggest_size: default_suggest_size(),
            suggest_fuzziness: default_suggest_fuzziness(),
        }
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            parallel: default_parallel(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: default_history_path() }
    }
}

impl Default for UserStoreConfig {
    fn default() -> Self {
        Self { path: default_users_path() }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__RANKING__RESULT_LIMIT=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the query request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.search_service.request_timeout_secs)
    }

    /// Get the bulk request timeout as Duration
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.search_service.bulk_timeout_secs)
    }

    /// Get the startup ping retry window as Duration
    pub fn connect_retry(&self) -> Duration {
        Duration::from_secs(self.search_service.connect_retry_secs)
    }
}
