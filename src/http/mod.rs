//! HTTP protocol layer module
//!
//! Body types, CORS policy, header rewriting and response builders shared by
//! the router, the upstream forwarder and the static asset handler.

pub mod cache;
pub mod cors;
pub mod headers;
pub mod mime;
pub mod response;

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

/// Error type carried by response bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every response leaving the router.
///
/// Upstream bodies are streamed through lazily, so this cannot be `Full`.
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

/// Body from an in-memory buffer
pub fn full(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Empty body
pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

// Re-export commonly used builders
pub use response::{
    build_304_response, build_404_response, build_405_response, build_error_json_response,
};
