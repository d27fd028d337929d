// Server loop module
// Accepts connections until a shutdown signal arrives

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections until `shutdown` resolves.
///
/// Connections already accepted keep running in their own tasks; the
/// caller decides how long to wait for them.
pub async fn start_server_loop<S>(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: S,
) where
    S: Future<Output = std::io::Result<&'static str>>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            signal = &mut shutdown => {
                match signal {
                    Ok(reason) => logger::log_shutdown(reason),
                    Err(e) => logger::log_error(&format!("Signal handler failed: {e}")),
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::handler::static_files::tests::asset_dir;
    use crate::server::create_reusable_listener;
    use std::sync::atomic::Ordering;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_preflight_over_tcp_and_stops_on_shutdown() {
        let dir = asset_dir("loop");
        let config = test_config("http://127.0.0.1:9", &dir.to_string_lossy());
        let state = Arc::new(AppState::new(&config).unwrap());
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&counter),
                    async move {
                        let _ = stop_rx.await;
                        Ok::<_, std::io::Error>("test shutdown")
                    },
                ));

                let response = raw_request(
                    addr,
                    "OPTIONS /chat HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 200 OK"));
                assert!(response
                    .to_ascii_lowercase()
                    .contains("access-control-allow-origin: https://smith-frontend.vercel.app"));

                stop_tx.send(()).unwrap();
                server.await.unwrap();
                assert!(counter.load(Ordering::SeqCst) <= 1);
            })
            .await;
    }
}
