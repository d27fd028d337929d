//! HTTP response building module
//!
//! Builders for the responses the relay produces itself. A builder error
//! is logged and replaced by a bare response with the same status.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::{empty, full, ProxyBody};

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", "public, max-age=3600")
        .body(empty())
        .unwrap_or_else(|e| fallback(StatusCode::NOT_MODIFIED, &e))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/plain")
        .body(full("404 Not Found"))
        .unwrap_or_else(|e| fallback(StatusCode::NOT_FOUND, &e))
}

/// Build 405 Method Not Allowed response for the static handler
pub fn build_405_response() -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD")
        .body(full("405 Method Not Allowed"))
        .unwrap_or_else(|e| fallback(StatusCode::METHOD_NOT_ALLOWED, &e))
}

/// Build the 500 `{"error": "..."}` response for a failed upstream call
pub fn build_error_json_response(message: &str) -> Response<ProxyBody> {
    let body = serde_json::json!({ "error": message }).to_string();

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", "application/json")
        .body(full(body))
        .unwrap_or_else(|e| fallback(StatusCode::INTERNAL_SERVER_ERROR, &e))
}

/// Build a static asset response with cache validators
pub fn build_asset_response(
    status: StatusCode,
    data: Bytes,
    content_type: &str,
    etag: Option<&str>,
    is_head: bool,
) -> Response<ProxyBody> {
    let content_length = data.len();
    let body = if is_head { empty() } else { full(data) };

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length);

    if let Some(etag) = etag {
        builder = builder
            .header("ETag", etag)
            .header("Cache-Control", "public, max-age=3600");
    }

    builder.body(body).unwrap_or_else(|e| fallback(status, &e))
}

fn fallback(status: StatusCode, error: &hyper::http::Error) -> Response<ProxyBody> {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_json_response() {
        let response = build_error_json_response("connection refused");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "application/json");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "connection refused");
    }

    #[tokio::test]
    async fn test_asset_response_head_has_length_but_no_body() {
        let response = build_asset_response(
            StatusCode::OK,
            Bytes::from_static(b"hello"),
            "text/plain",
            Some("\"abc\""),
            true,
        );
        assert_eq!(response.headers()["content-length"], "5");
        assert_eq!(response.headers()["etag"], "\"abc\"");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_405_lists_allowed_methods() {
        let response = build_405_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "GET, HEAD");
    }
}
