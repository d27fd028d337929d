// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Upstream origin that API paths are forwarded to
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Absolute http(s) origin, e.g. `https://api.example.com`
    pub origin: String,
    /// Redirect hops followed before the redirect response itself is relayed
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_redirects() -> usize {
    10
}

/// Static asset configuration (the default handler)
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    pub dir: String,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
    /// Served with status 404 when no asset matches, if present under `dir`
    #[serde(default)]
    pub not_found_page: Option<String>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string()]
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing` filter directive (`RUST_LOG` takes precedence)
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    #[serde(default)]
    pub max_connections: Option<u64>,
}
