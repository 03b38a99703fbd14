mod auth;
mod handlers;

use crate::cors;
use crate::proxy::context::BoxBody;
use crate::server::GatewayState;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::net::SocketAddr;

/// Admin HTTP surface — everything under `/admin`. Bypasses the proxy
/// pipeline entirely: no route lookup, no rate limiting, no forwarding.
pub async fn handle_admin(req: Request<Incoming>, state: GatewayState, _peer_addr: SocketAddr) -> Response<BoxBody> {
    let req_headers = req.headers().clone();

    if cors::is_preflight(req.method(), &req_headers) {
        let config = state.config.load();
        return cors::preflight_response(&req_headers, &config.allowed_origins);
    }

    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let mut response = match (method.clone(), path.as_str()) {
        (Method::GET, "/admin/health_check") => handlers::health_check(&state).await,
        (Method::POST, "/admin/login") => handlers::login(req, &state).await,
        _ => {
            if let Some(unauthorized) = handlers::require_auth(&req, &state) {
                unauthorized
            } else {
                match (method, path.as_str()) {
                    (Method::POST, "/admin/logout") => handlers::logout().await,
                    (Method::GET, "/admin/me") => handlers::me(&state).await,
                    (Method::GET, "/admin/routes") => handlers::list_routes(&state).await,
                    (Method::PUT, "/admin/routes") => handlers::replace_routes(req, &state).await,
                    (Method::POST, "/admin/clear") => handlers::clear_counters(&state).await,
                    (Method::GET, "/admin/metrics") => handlers::metrics(&state).await,
                    (Method::DELETE, p) if p.starts_with("/admin/routes/") => {
                        let prefix = format!("/{}", &p["/admin/routes/".len()..]);
                        handlers::delete_route(&prefix, &state).await
                    }
                    (_, p) if p.starts_with("/admin/") => handlers::not_found(),
                    _ => handlers::method_not_allowed(),
                }
            }
        }
    };

    let config = state.config.load();
    cors::apply_cors_headers(&req_headers, &config.allowed_origins, &mut response);
    response
}
