use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    Config(String),
    RouteNotFound,
    RateLimited { retry_after: u64 },
    CounterStoreUnavailable(String),
    UpstreamTransport(String),
    Auth(String),
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Config(msg) => write!(f, "config error: {}", msg),
            GatewayError::RouteNotFound => write!(f, "route not found"),
            GatewayError::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {}s", retry_after)
            }
            GatewayError::CounterStoreUnavailable(msg) => {
                write!(f, "counter store unavailable: {}", msg)
            }
            GatewayError::UpstreamTransport(msg) => write!(f, "upstream transport error: {}", msg),
            GatewayError::Auth(msg) => write!(f, "auth error: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Status code this error maps to when turned into a downstream HTTP response.
/// `UpstreamHTTPError` has no variant here — a non-2xx upstream response is
/// passed through verbatim, it never becomes a `GatewayError`.
impl GatewayError {
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Config(_) => 500,
            GatewayError::RouteNotFound => 404,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::CounterStoreUnavailable(_) => 500,
            GatewayError::UpstreamTransport(_) => 500,
            GatewayError::Auth(_) => 401,
            GatewayError::Internal(_) => 500,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            GatewayError::RouteNotFound => "Route not found".to_string(),
            GatewayError::RateLimited { .. } => "Too many requests".to_string(),
            GatewayError::CounterStoreUnavailable(_) => "Rate limiting error".to_string(),
            GatewayError::Auth(_) => "Not authenticated".to_string(),
            other => format!("Internal server error: {}", other),
        }
    }
}
