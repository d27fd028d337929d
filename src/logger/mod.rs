//! Logger module
//!
//! Installs the `tracing` subscriber and provides one helper per event the
//! relay logs:
//! - Server lifecycle
//! - Access log lines (target `access`) in several formats
//! - Forwarding and forward failures
//! - Errors and warnings

mod format;

pub use format::AccessLogEntry;

use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;

use hyper::Method;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{ForwardError, RelayError};

/// Initialize the global subscriber
///
/// Should be called once at application startup. When a log file is
/// configured the returned guard must be kept alive to flush it.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>, RelayError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| RelayError::Logger(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| RelayError::Logger(format!("not a file: {}", path.display())))?;

            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            builder
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| RelayError::Logger(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            builder
                .try_init()
                .map_err(|e| RelayError::Logger(e.to_string()))?;
            Ok(None)
        }
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, upstream: &str, assets: &Path) {
    tracing::info!("======================================");
    tracing::info!("Relay started successfully");
    tracing::info!("Listening on: http://{addr}");
    tracing::info!("Forwarding API paths to: {upstream}");
    tracing::info!("Serving assets from: {}", assets.display());
    tracing::info!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!("Max connections: {max}");
    }
    if let Some(ref path) = config.logging.file {
        tracing::info!("Log file: {path}");
    }
    tracing::info!("======================================");
}

pub fn log_shutdown(reason: &str) {
    tracing::info!("[Shutdown] {reason}, no longer accepting connections");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_rejected(peer_addr: &SocketAddr, active: usize, max: u64) {
    tracing::warn!("[Connection] Max connections reached: {active}/{max}, rejected {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_forwarding(method: &Method, path: &str) {
    tracing::info!("Forwarding {method} request to {path}");
}

pub fn log_forward_failed(method: &Method, path: &str, err: &ForwardError) {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    tracing::error!("Error forwarding {method} {path}: {message}");
}

pub fn log_error(message: &str) {
    tracing::error!("[ERROR] {message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("[WARN] {message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}
