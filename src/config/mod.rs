// Configuration module entry point
// Loads configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::RelayError;

// Re-export public types
pub use state::AppState;
pub use types::{
    AssetsConfig, Config, LoggingConfig, PerformanceConfig, ServerConfig, UpstreamConfig,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; environment variables prefixed with `RELAY`
    /// (e.g. `RELAY__UPSTREAM__ORIGIN`) override it.
    pub fn load_from(config_path: &str) -> Result<Self, RelayError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8788)?
            .set_default("upstream.origin", "http://127.0.0.1:8000")?
            .set_default("upstream.max_redirects", 10)?
            .set_default("assets.dir", "public")?
            .set_default("assets.index_files", vec!["index.html"])?
            .set_default("assets.not_found_page", "404.html")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot express
    pub fn validate(&self) -> Result<(), RelayError> {
        // tokio panics on a zero-thread runtime
        if self.server.workers == Some(0) {
            return Err(RelayError::InvalidWorkers);
        }
        self.get_socket_addr()?;
        self.upstream_origin()?;
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, RelayError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| RelayError::InvalidAddress { addr, source })
    }

    /// Parsed upstream origin; only absolute http(s) URLs are accepted
    pub fn upstream_origin(&self) -> Result<reqwest::Url, RelayError> {
        let origin = &self.upstream.origin;
        let invalid = |reason: String| RelayError::InvalidOrigin {
            origin: origin.clone(),
            reason,
        };

        let url = reqwest::Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https".to_string()));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }
}
