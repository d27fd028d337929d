//! Request routing dispatch module
//!
//! Entry point for every inbound request. Classifies it, then answers a
//! preflight directly, forwards an API call upstream, or falls back to the
//! static asset handler. Whatever branch runs, the response leaves with the
//! CORS allow-origin and allow-credentials headers set.

use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http::headers::apply_streaming_headers;
use crate::http::{build_error_json_response, BoxError, ProxyBody};
use crate::logger;

/// Path prefixes forwarded to the upstream origin, checked in order
pub const FORWARDED_PREFIXES: &[&str] = &["/chat", "/agent-chat", "/related-questions", "/health"];

/// Forwarded prefixes whose responses are server-sent event streams
pub const STREAMING_PREFIXES: &[&str] = &["/chat", "/agent-chat"];

/// What to do with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Forward { streaming: bool },
    Static,
}

/// Classify a request; first match wins
pub fn classify(method: &Method, path: &str) -> Route {
    if *method == Method::OPTIONS {
        return Route::Preflight;
    }

    if FORWARDED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        let streaming = STREAMING_PREFIXES.iter().any(|p| path.starts_with(p));
        return Route::Forward { streaming };
    }

    Route::Static
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<ProxyBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let route = classify(req.method(), req.uri().path());

    let response = match route {
        Route::Preflight => state.cors.preflight_response(),
        Route::Forward { streaming } => forward_request(req, &state, streaming).await,
        Route::Static => {
            let mut response = state
                .assets
                .serve(req.method(), req.uri().path(), req.headers())
                .await;
            state.cors.apply(response.headers_mut());
            response
        }
    };

    Ok(response)
}

async fn forward_request<B>(req: Request<B>, state: &AppState, streaming: bool) -> Response<ProxyBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    logger::log_forwarding(&parts.method, parts.uri.path());

    match state
        .upstream
        .forward(&parts.method, &parts.uri, &parts.headers, body)
        .await
    {
        Ok(mut response) => {
            let headers = response.headers_mut();
            state.cors.apply(headers);
            if streaming {
                apply_streaming_headers(headers);
            }
            response
        }
        Err(e) => {
            logger::log_forward_failed(&parts.method, parts.uri.path(), &e);
            let mut response = build_error_json_response(&e.to_string());
            state.cors.apply(response.headers_mut());
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::handler::static_files::tests::asset_dir;
    use futures::StreamExt;
    use http_body_util::combinators::UnsyncBoxBody;
    use http_body_util::{BodyExt, Empty, Full, StreamBody};
    use hyper::body::{Frame, Incoming};
    use hyper::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE, LOCATION,
    };
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::StatusCode;
    use hyper_util::rt::TokioIo;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const ORIGIN: &str = "https://smith-frontend.vercel.app";

    type UpstreamBody = UnsyncBoxBody<Bytes, Infallible>;

    fn upstream_full(data: impl Into<Bytes>) -> UpstreamBody {
        Full::new(data.into()).boxed_unsync()
    }

    /// Test upstream: echoes what it received and serves a few fixed paths
    async fn upstream_service(req: Request<Incoming>) -> Result<Response<UpstreamBody>, Infallible> {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();
        let session = req
            .headers()
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = req.into_body().collect().await.map(|b| b.to_bytes()).unwrap_or_default();

        let response = match path.as_str() {
            "/health" => Response::builder()
                .status(200)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
                .body(upstream_full(r#"{"status":"ok"}"#)),
            "/health/redirect" => Response::builder()
                .status(302)
                .header(LOCATION, "/health")
                .body(upstream_full("")),
            "/health/missing" => Response::builder()
                .status(404)
                .header(CONTENT_TYPE, "application/json")
                .body(upstream_full(r#"{"detail":"Not Found"}"#)),
            "/chat/slow" => {
                let first = futures::stream::iter(vec![Ok::<_, Infallible>(Frame::data(
                    Bytes::from_static(b"data: one\n\n"),
                ))]);
                let body = StreamBody::new(first.chain(futures::stream::pending()));
                Response::builder()
                    .status(200)
                    .header(CONTENT_TYPE, "text/plain")
                    .body(body.boxed_unsync())
            }
            _ => {
                let echo = serde_json::json!({
                    "method": method,
                    "path": path,
                    "query": query,
                    "session": session,
                    "body": String::from_utf8_lossy(&body),
                });
                Response::builder()
                    .status(201)
                    .header(CONTENT_TYPE, "application/json")
                    .header(CACHE_CONTROL, "max-age=60")
                    .header("x-upstream", "yes")
                    .body(upstream_full(echo.to_string()))
            }
        };

        Ok(response.unwrap())
    }

    async fn spawn_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service_fn(upstream_service))
                        .await;
                });
            }
        });
        addr
    }

    /// Origin on which nothing listens
    fn unreachable_origin() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    fn state_for(origin: &str, name: &str) -> Arc<AppState> {
        let dir = asset_dir(name);
        let config = test_config(origin, &dir.to_string_lossy());
        Arc::new(AppState::new(&config).unwrap())
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-session-id", "s-42")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn json_body(response: Response<ProxyBody>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn assert_cors(response: &Response<ProxyBody>) {
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&Method::OPTIONS, "/chat"), Route::Preflight);
        assert_eq!(classify(&Method::OPTIONS, "/static/logo.png"), Route::Preflight);
        assert_eq!(
            classify(&Method::POST, "/chat"),
            Route::Forward { streaming: true }
        );
        assert_eq!(
            classify(&Method::POST, "/agent-chat/v2"),
            Route::Forward { streaming: true }
        );
        assert_eq!(
            classify(&Method::POST, "/related-questions"),
            Route::Forward { streaming: false }
        );
        assert_eq!(
            classify(&Method::GET, "/health"),
            Route::Forward { streaming: false }
        );
        assert_eq!(classify(&Method::GET, "/static/logo.png"), Route::Static);
        assert_eq!(classify(&Method::GET, "/api/chat"), Route::Static);
    }

    #[test]
    fn test_classify_is_plain_prefix_match() {
        assert_eq!(
            classify(&Method::GET, "/chatroom"),
            Route::Forward { streaming: true }
        );
        assert_eq!(
            classify(&Method::GET, "/healthz"),
            Route::Forward { streaming: false }
        );
    }

    #[tokio::test]
    async fn test_options_chat_is_answered_locally() {
        // Unreachable upstream proves no forwarding happens
        let state = state_for(&unreachable_origin(), "preflight");
        let response = handle_request(request(Method::OPTIONS, "/chat", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_get_health_is_relayed() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "health");

        let response = handle_request(request(Method::GET, "/health", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_forwarded_post_carries_body_query_and_headers() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "echo");

        let response = handle_request(
            request(Method::POST, "/related-questions?lang=en", r#"{"msg":"hi"}"#),
            state,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_cors(&response);
        assert_eq!(response.headers()["x-upstream"], "yes");
        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=60");

        let echo = json_body(response).await;
        assert_eq!(echo["method"], "POST");
        assert_eq!(echo["path"], "/related-questions");
        assert_eq!(echo["query"], "lang=en");
        assert_eq!(echo["session"], "s-42");
        assert_eq!(echo["body"], r#"{"msg":"hi"}"#);
    }

    #[tokio::test]
    async fn test_forwarded_get_sends_no_body() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "getbody");

        let response = handle_request(
            request(Method::GET, "/related-questions", "should not be sent"),
            state,
        )
        .await
        .unwrap();

        let echo = json_body(response).await;
        assert_eq!(echo["method"], "GET");
        assert_eq!(echo["body"], "");
    }

    #[tokio::test]
    async fn test_chat_forces_event_stream_headers() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "sse");

        let response = handle_request(request(Method::POST, "/chat", r#"{"q":1}"#), state)
            .await
            .unwrap();

        // Upstream echo answers application/json with max-age=60
        assert_cors(&response);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[CONNECTION], "keep-alive");
        assert_eq!(response.headers()["x-accel-buffering"], "no");
    }

    #[tokio::test]
    async fn test_stream_is_not_buffered() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "slow");

        let response = handle_request(request(Method::GET, "/chat/slow", ""), state)
            .await
            .unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

        // The upstream never finishes; the first event must still arrive
        let mut body = response.into_body();
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("first event was buffered")
            .unwrap()
            .unwrap();
        assert_eq!(&frame.into_data().unwrap()[..], b"data: one\n\n");
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_relayed() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "upstream404");

        let response = handle_request(request(Method::GET, "/health/missing", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_cors(&response);
        assert_eq!(json_body(response).await["detail"], "Not Found");
    }

    #[tokio::test]
    async fn test_redirects_are_followed() {
        let addr = spawn_upstream().await;
        let state = state_for(&format!("http://{addr}"), "redirect");

        let response = handle_request(request(Method::GET, "/health/redirect", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_returns_json_500() {
        let state = state_for(&unreachable_origin(), "unreachable");

        let response = handle_request(
            request(Method::POST, "/agent-chat", r#"{"msg":"hi"}"#),
            state,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let json = json_body(response).await;
        assert!(!json["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_fallback_adds_cors() {
        let state = state_for(&unreachable_origin(), "static");

        let response = handle_request(request(Method::GET, "/static/logo.png", ""), state)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"\x89PNG-logo");
    }

    #[tokio::test]
    async fn test_static_not_found_adds_cors() {
        let state = state_for(&unreachable_origin(), "static404");

        let request = Request::builder()
            .uri("/missing/page")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = handle_request(request, state).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_cors(&response);
    }
}
