use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

/// How long in-flight connections may run after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logger::init(&cfg)?;

    // Create Tokio runtime, worker threads from config (CPU cores otherwise)
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let state = Arc::new(config::AppState::new(&cfg)?);
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(
        &addr,
        &cfg,
        state.upstream.origin().as_str(),
        state.assets.root(),
    );

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            state,
            active_connections,
            server::shutdown_signal(),
        ))
        .await;

    // Event streams can be open indefinitely, so the drain is bounded
    if tokio::time::timeout(SHUTDOWN_GRACE, local).await.is_err() {
        logger::log_warning("Shutdown grace period elapsed, dropping open connections");
    }

    Ok(())
}
