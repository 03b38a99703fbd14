use super::auth;
use crate::config::RouteConfig;
use crate::proxy::context::{detail_response, json_body, BoxBody};
use crate::server::GatewayState;
use http::{HeaderValue, Response, StatusCode};
use hyper::body::Incoming;
use hyper::Request;
use http_body_util::BodyExt;
use serde_json::json;
use std::collections::BTreeMap;

fn routes_by_prefix(routes: Vec<RouteConfig>) -> BTreeMap<String, RouteConfig> {
    routes.into_iter().map(|r| (r.prefix.clone(), r)).collect()
}

fn unauthorized() -> Response<BoxBody> {
    let mut resp = detail_response(StatusCode::UNAUTHORIZED, "Not authenticated");
    resp.headers_mut().insert("www-authenticate", HeaderValue::from_static("Basic"));
    resp
}

pub async fn health_check(state: &GatewayState) -> Response<BoxBody> {
    let config = state.config.load();
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({
            "status": "ok",
            "profile": config.profile,
            "version": env!("CARGO_PKG_VERSION"),
        })))
        .unwrap()
}

pub async fn login(req: Request<Incoming>, state: &GatewayState) -> Response<BoxBody> {
    let config = state.config.load();
    let Some(username) = auth::verify_login_credentials(req.headers(), &config) else {
        return detail_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };

    let mut resp = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"name": username})))
        .unwrap();
    resp.headers_mut().insert(
        "set-cookie",
        HeaderValue::from_str(&auth::issue_session_cookie(&username)).unwrap(),
    );
    resp
}

pub async fn logout() -> Response<BoxBody> {
    let mut resp = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"status": "ok"})))
        .unwrap();
    resp.headers_mut()
        .insert("set-cookie", HeaderValue::from_str(&auth::logout_cookie()).unwrap());
    resp
}

pub async fn me(state: &GatewayState) -> Response<BoxBody> {
    let config = state.config.load();
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"name": config.admin_username})))
        .unwrap()
}

pub async fn list_routes(state: &GatewayState) -> Response<BoxBody> {
    let routes = routes_by_prefix(state.repository.list_all().await);
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"routes": routes})))
        .unwrap()
}

pub async fn replace_routes(req: Request<Incoming>, state: &GatewayState) -> Response<BoxBody> {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let Ok(incoming) = serde_json::from_slice::<BTreeMap<String, RouteConfig>>(&body) else {
        return detail_response(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    let mut routes = Vec::with_capacity(incoming.len());
    for (prefix, mut route) in incoming {
        if !prefix.starts_with('/') {
            return detail_response(StatusCode::BAD_REQUEST, "Route prefix must begin with '/'");
        }
        route.prefix = prefix;
        routes.push(route);
    }

    state.repository.replace_active(routes).await;
    state.reload().await;
    if let Err(e) = state.rate_limiter.clear_all().await {
        tracing::warn!("admin: counter store clear after route replace failed, error={}", e);
    }

    let routes = routes_by_prefix(state.repository.list_all().await);
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"routes": routes})))
        .unwrap()
}

pub async fn delete_route(prefix: &str, state: &GatewayState) -> Response<BoxBody> {
    if !state.repository.soft_delete(prefix).await {
        return detail_response(StatusCode::NOT_FOUND, "Route not found");
    }
    state.reload().await;
    if let Err(e) = state.rate_limiter.clear_route(prefix).await {
        tracing::warn!("admin: counter store clear for route failed, prefix={}, error={}", prefix, e);
    }
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!({"status": "ok"})))
        .unwrap()
}

pub async fn clear_counters(state: &GatewayState) -> Response<BoxBody> {
    match state.rate_limiter.clear_all().await {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(json_body(&json!({"status": "ok"})))
            .unwrap(),
        Err(e) => {
            tracing::error!("admin: clear counters failed, error={}", e);
            detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Rate limiting error")
        }
    }
}

pub async fn metrics(state: &GatewayState) -> Response<BoxBody> {
    let snapshot = state.metrics.snapshot();
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(json_body(&json!(snapshot)))
        .unwrap()
}

pub fn require_auth(req: &Request<Incoming>, state: &GatewayState) -> Option<Response<BoxBody>> {
    let config = state.config.load();
    if auth::is_authenticated(req.headers(), &config) {
        None
    } else {
        Some(unauthorized())
    }
}

async fn read_body(req: Request<Incoming>) -> Result<bytes::Bytes, Response<BoxBody>> {
    req.into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|_| detail_response(StatusCode::BAD_REQUEST, "Failed to read request body"))
}

pub fn not_found() -> Response<BoxBody> {
    detail_response(StatusCode::NOT_FOUND, "Not found")
}

pub fn method_not_allowed() -> Response<BoxBody> {
    detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
