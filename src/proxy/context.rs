use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use std::time::Instant;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new()).map_err(|never| match never {}).boxed()
}

pub fn json_body(json: &serde_json::Value) -> BoxBody {
    full_body(json.to_string())
}

pub fn detail_response(status: StatusCode, detail: &str) -> hyper::Response<BoxBody> {
    hyper::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(json_body(&serde_json::json!({"detail": detail})))
        .unwrap()
}

/// Per-request context that flows through route lookup, the rule chain, and
/// forwarding. Analogous to nginx's `ngx_http_request_t` — carries request
/// metadata and accumulates state across the pipeline phases.
pub struct RequestContext {
    pub method: String,
    /// The inbound path exactly as received — used for metrics bucketing
    /// and further rule lookups, never mutated.
    pub original_path: String,
    /// The path actually forwarded upstream; rewritten in place by the
    /// URL-rewrite filter's pre-phase.
    pub outbound_path: String,
    pub query: Option<String>,
    pub client_id: String,
    pub matched_prefix: Option<String>,
    pub rate_limit_count: Option<u64>,
    pub start: Instant,
}

impl RequestContext {
    pub fn new(method: String, path: String, query: Option<String>, client_id: String) -> Self {
        Self {
            method,
            outbound_path: path.clone(),
            original_path: path,
            query,
            client_id,
            matched_prefix: None,
            rate_limit_count: None,
            start: Instant::now(),
        }
    }

    pub fn error_response(&self, status: StatusCode, detail: &str) -> hyper::Response<BoxBody> {
        detail_response(status, detail)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
