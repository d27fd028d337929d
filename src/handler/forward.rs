//! Upstream forwarding
//!
//! Issues the outbound copy of an API request against the configured origin
//! and turns the upstream answer into a relay response whose body is a live
//! stream of the upstream bytes.

use futures::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Body, Bytes, Frame};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Method, Response, Uri};

use crate::error::{ForwardError, RelayError};
use crate::http::headers::{outbound_request_headers, strip_hop_headers};
use crate::http::{BoxError, ProxyBody};

/// HTTP client bound to one upstream origin
pub struct Upstream {
    client: reqwest::Client,
    origin: reqwest::Url,
}

impl Upstream {
    pub fn new(origin: reqwest::Url, max_redirects: usize) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .no_proxy()
            .build()
            .map_err(RelayError::Client)?;

        Ok(Self { client, origin })
    }

    pub const fn origin(&self) -> &reqwest::Url {
        &self.origin
    }

    /// Same path and query as the inbound request, on the upstream origin
    pub fn target_url(&self, uri: &Uri) -> reqwest::Url {
        let mut url = self.origin.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }

    /// Send the request upstream and wait for the response head.
    ///
    /// The body is withheld for `GET` and when it is known to be empty;
    /// otherwise it is streamed through unmodified.
    pub async fn forward<B>(
        &self,
        method: &Method,
        uri: &Uri,
        inbound_headers: &HeaderMap,
        body: B,
    ) -> Result<Response<ProxyBody>, ForwardError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let url = self.target_url(uri);
        let mut headers = outbound_request_headers(inbound_headers);
        let send_body = *method != Method::GET && !body.is_end_stream();
        if !send_body {
            headers.remove(CONTENT_LENGTH);
        }

        let mut request = self.client.request(method.clone(), url).headers(headers);
        if send_body {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = request.send().await?;
        Ok(relay_response(upstream))
    }
}

/// Copy status and headers; stream the body as it arrives
fn relay_response(upstream: reqwest::Response) -> Response<ProxyBody> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_headers(&mut headers);

    let frames = upstream
        .bytes_stream()
        .map_ok(Frame::data)
        .map_err(|e| Box::new(e) as BoxError);

    let mut response = Response::new(StreamBody::new(frames).boxed_unsync());
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
