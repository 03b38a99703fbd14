use crate::error::GatewayError;
use crate::proxy::context::full_body;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{HeaderMap, Method, Request};
use std::time::Duration;

/// Reconstructs and issues the outbound request, then buffers and returns
/// the upstream response. The gateway acts as a client (follows redirects,
/// owns its own timeout) rather than a transparent passthrough of the
/// transport connection.
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("reqwest client configuration is always valid");
        Self { client }
    }

    /// `target_url` has no trailing slash assumed; `path` and `query` are
    /// the outbound (possibly rewritten) path and the raw query string.
    pub async fn forward(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: Incoming,
        target_url: &str,
        path: &str,
        query: Option<&str>,
    ) -> Result<hyper::Response<crate::proxy::context::BoxBody>, GatewayError> {
        let mut url = format!("{target_url}{path}");
        if let Some(q) = query {
            if !q.is_empty() {
                url.push('?');
                url.push_str(q);
            }
        }

        let body_bytes = body
            .collect()
            .await
            .map_err(|e| GatewayError::UpstreamTransport(format!("failed to read request body: {e}")))?
            .to_bytes();

        let mut outbound_headers = reqwest::header::HeaderMap::new();
        for (name, value) in headers.iter() {
            if name.as_str().eq_ignore_ascii_case("host") {
                continue;
            }
            outbound_headers.insert(name.clone(), value.clone());
        }

        let request = self
            .client
            .request(method.clone(), &url)
            .headers(outbound_headers)
            .body(body_bytes);

        let upstream_response = request
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;

        let status = upstream_response.status();
        let mut response_headers = upstream_response.headers().clone();
        let response_body = upstream_response
            .bytes()
            .await
            .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))?;

        // hop-by-hop, transport-owned — must not be carried back to the
        // downstream client as hyper will re-derive them.
        response_headers.remove(reqwest::header::TRANSFER_ENCODING);
        response_headers.remove(reqwest::header::CONTENT_LENGTH);
        response_headers.remove(reqwest::header::CONNECTION);

        let mut builder = hyper::Response::builder().status(status.as_u16());
        for (name, value) in response_headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }

        builder
            .body(full_body(Bytes::from(response_body)))
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }
}
