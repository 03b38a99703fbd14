use crate::proxy::context::{empty_body, BoxBody};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};

fn allowed_origin(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| a == "*" || a == origin)
}

/// Attach `Access-Control-Allow-*` headers to an existing response when the
/// request's `Origin` is in the allow-list. No-op (not an error) otherwise —
/// the browser enforces CORS, not this layer.
pub fn apply_cors_headers(req_headers: &HeaderMap, allowed_origins: &[String], resp: &mut Response<BoxBody>) {
    let Some(origin) = req_headers.get("origin").and_then(|v| v.to_str().ok()) else {
        return;
    };
    if !allowed_origin(origin, allowed_origins) {
        return;
    }
    let headers = resp.headers_mut();
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_str(origin).unwrap_or_else(|_| HeaderValue::from_static("null")),
    );
    headers.insert("access-control-allow-credentials", HeaderValue::from_static("true"));
    headers.insert("vary", HeaderValue::from_static("origin"));
}

/// A CORS preflight is always an `OPTIONS` request carrying
/// `Access-Control-Request-Method`. Answered directly — it never reaches the
/// dispatcher's route lookup.
pub fn is_preflight(method: &Method, req_headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && req_headers.contains_key("access-control-request-method")
}

pub fn preflight_response(req_headers: &HeaderMap, allowed_origins: &[String]) -> Response<BoxBody> {
    let mut resp = Response::builder().status(StatusCode::NO_CONTENT).body(empty_body()).unwrap();
    apply_cors_headers(req_headers, allowed_origins, &mut resp);
    let headers = resp.headers_mut();
    headers.insert("access-control-allow-methods", HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"));
    headers.insert("access-control-allow-headers", HeaderValue::from_static("content-type, authorization"));
    headers.insert("access-control-max-age", HeaderValue::from_static("600"));
    resp
}
