use crate::cors;
use crate::proxy::context::RequestContext;
use crate::proxy::filter::FilterResult;
use crate::rate_limiter::client_identifier;
use crate::server::GatewayState;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::net::SocketAddr;

use super::context::BoxBody;

/// Gateway dispatcher — the entry point for every HTTP request:
///
/// 1. `/admin*` bypasses the core pipeline entirely.
/// 2. Resolve route via the route table; no match → 404.
/// 3. Run the rule-chain pre-phase.
/// 4. If not short-circuited, forward.
/// 5. Run the rule-chain post-phase.
/// 6. Record metrics, return the response.
pub async fn handle_request(
    req: Request<Incoming>,
    state: GatewayState,
    peer_addr: SocketAddr,
) -> Result<Response<BoxBody>, hyper::Error> {
    let path = req.uri().path().to_string();

    if path.starts_with("/admin") {
        return Ok(crate::admin::handle_admin(req, state, peer_addr).await);
    }

    let req_headers = req.headers().clone();
    if cors::is_preflight(req.method(), &req_headers) {
        let config = state.config.load();
        return Ok(cors::preflight_response(&req_headers, &config.allowed_origins));
    }

    let mut response = dispatch_proxy(req, state.clone(), peer_addr, path).await;
    let config = state.config.load();
    cors::apply_cors_headers(&req_headers, &config.allowed_origins, &mut response);
    Ok(response)
}

async fn dispatch_proxy(
    req: Request<Incoming>,
    state: GatewayState,
    peer_addr: SocketAddr,
    path: String,
) -> Response<BoxBody> {
    let (parts, body) = req.into_parts();
    let query = parts.uri.query().map(|q| q.to_string());

    let forwarded_for = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let client_id = client_identifier(forwarded_for, Some(&peer_addr.ip().to_string()));

    let mut ctx = RequestContext::new(parts.method.to_string(), path.clone(), query.clone(), client_id);

    let snapshot = state.route_table.load();
    let route = match snapshot.lookup(&path) {
        Some(route) => route,
        None => {
            let resp = ctx.error_response(StatusCode::NOT_FOUND, "Route not found");
            state
                .metrics
                .record(&ctx.original_path, &ctx.method, &ctx.client_id, 404, false);
            return resp;
        }
    };
    ctx.matched_prefix = Some(route.config.prefix.clone());

    let mut short_circuit = None;
    for filter in &route.filters {
        if !filter.phase().runs_pre() {
            continue;
        }
        match filter.pre_process(&mut ctx).await {
            FilterResult::Continue => {}
            FilterResult::Reject(resp) => {
                short_circuit = Some(resp);
                break;
            }
        }
    }

    let mut response = match short_circuit {
        Some(resp) => resp,
        None => match state
            .forwarder
            .forward(
                &parts.method,
                &parts.headers,
                body,
                &route.config.target_url,
                &ctx.outbound_path,
                query.as_deref(),
            )
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("proxy: forward failed, prefix={}, error={}", route.config.prefix, e);
                let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                ctx.error_response(status, &e.detail())
            }
        },
    };

    for filter in &route.filters {
        if filter.phase().runs_post() {
            filter.post_process(&ctx, &mut response).await;
        }
    }

    let status = response.status().as_u16();
    let is_rate_limited = status == 429;
    state
        .metrics
        .record(&ctx.original_path, &ctx.method, &ctx.client_id, status, is_rate_limited);

    tracing::info!(
        method = %ctx.method,
        path = %ctx.original_path,
        status = status,
        duration_secs = ctx.elapsed_secs(),
        client_id = %ctx.client_id,
        "access"
    );

    response
}
