//! CORS policy
//!
//! A single fixed policy: one literal allowed origin with credentials.
//! The header values are a compatibility contract with the frontend and
//! must stay byte-for-byte as they are.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use hyper::{Response, StatusCode};

use super::{empty, ProxyBody};

pub const ALLOWED_ORIGIN: &str = "https://smith-frontend.vercel.app";
pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "OPTIONS"];
pub const ALLOWED_HEADERS: &[&str] = &[
    "Content-Type",
    "Authorization",
    "X-Session-ID",
    "X-Request-ID",
    "X-Cancel-Previous",
];
pub const MAX_AGE_SECS: u32 = 86400;

/// Immutable CORS policy, built once and shared through `AppState`
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: bool,
    max_age: HeaderValue,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static(ALLOWED_ORIGIN),
            allow_methods: join_header_list(ALLOWED_METHODS),
            allow_headers: join_header_list(ALLOWED_HEADERS),
            allow_credentials: true,
            max_age: HeaderValue::from(MAX_AGE_SECS),
        }
    }
}

impl CorsPolicy {
    /// Overwrite allow-origin and allow-credentials, whatever was there before
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(if self.allow_credentials {
                "true"
            } else {
                "false"
            }),
        );
    }

    /// 200 with an empty body and the full preflight header set
    pub fn preflight_response(&self) -> Response<ProxyBody> {
        let mut response = Response::new(empty());
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        self.apply(headers);
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }
}

fn join_header_list(items: &[&str]) -> HeaderValue {
    // The lists above are ASCII constants
    HeaderValue::from_str(&items.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(""))
}
