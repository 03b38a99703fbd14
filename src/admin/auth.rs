use crate::config::GatewayConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::HeaderMap;
use std::time::{SystemTime, UNIX_EPOCH};

const SESSION_COOKIE_NAME: &str = "session";
const SESSION_TTL_SECS: f64 = 3600.0;

fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Constant-time byte comparison — avoids leaking credential length/prefix
/// through branch timing.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Opaque session token: `base64("{username}:{issued_at_unix_secs}")`.
/// Carries no server-side state — verification just checks the embedded
/// username against config and that the token hasn't aged past the TTL.
pub fn issue_session_cookie(username: &str) -> String {
    let raw = format!("{username}:{}", now_secs());
    format!("{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Strict", BASE64.encode(raw))
}

pub fn logout_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

fn parse_session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get("cookie")?.to_str().ok()?;
    for pair in cookie_header.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
            return Some(value.to_string());
        }
    }
    None
}

fn verify_session(token: &str, config: &GatewayConfig) -> bool {
    let Ok(decoded) = BASE64.decode(token) else {
        return false;
    };
    let Ok(raw) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, issued_at)) = raw.split_once(':') else {
        return false;
    };
    let Ok(issued_at) = issued_at.parse::<f64>() else {
        return false;
    };
    if now_secs() - issued_at > SESSION_TTL_SECS {
        return false;
    }
    constant_time_eq(username, &config.admin_username)
}

fn parse_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let raw = String::from_utf8(decoded).ok()?;
    let (username, password) = raw.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn verify_basic(headers: &HeaderMap, config: &GatewayConfig) -> bool {
    let Some((username, password)) = parse_basic_credentials(headers) else {
        return false;
    };
    constant_time_eq(&username, &config.admin_username) && constant_time_eq(&password, &config.admin_password)
}

/// Verifies the `Authorization: Basic` header against configured admin
/// credentials and, on success, returns the username to embed in a new
/// session cookie. Used by `/admin/login`, which authenticates via Basic
/// auth rather than a request body.
pub fn verify_login_credentials(headers: &HeaderMap, config: &GatewayConfig) -> Option<String> {
    let (username, password) = parse_basic_credentials(headers)?;
    if constant_time_eq(&username, &config.admin_username) && constant_time_eq(&password, &config.admin_password) {
        Some(username)
    } else {
        None
    }
}

/// `/admin/health_check` and `/admin/login` are the only unauthenticated
/// admin endpoints; everything else requires a valid session cookie or
/// HTTP Basic credentials.
pub fn is_authenticated(headers: &HeaderMap, config: &GatewayConfig) -> bool {
    if let Some(token) = parse_session_cookie(headers) {
        if verify_session(&token, config) {
            return true;
        }
    }
    verify_basic(headers, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn config() -> GatewayConfig {
        let mut c = GatewayConfig::default();
        c.admin_username = "admin".to_string();
        c.admin_password = "secret".to_string();
        c
    }

    #[test]
    fn test_session_roundtrip_authenticates() {
        let cfg = config();
        let cookie = issue_session_cookie("admin");
        let token = cookie.split(';').next().unwrap().split('=').nth(1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_str(&format!("session={token}")).unwrap());
        assert!(is_authenticated(&headers, &cfg));
    }

    #[test]
    fn test_session_wrong_username_rejected() {
        let cfg = config();
        let cookie = issue_session_cookie("someone-else");
        let token = cookie.split(';').next().unwrap().split('=').nth(1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_str(&format!("session={token}")).unwrap());
        assert!(!is_authenticated(&headers, &cfg));
    }

    #[test]
    fn test_basic_auth_correct_credentials() {
        let cfg = config();
        let encoded = BASE64.encode("admin:secret");
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());
        assert!(is_authenticated(&headers, &cfg));
    }

    #[test]
    fn test_basic_auth_wrong_password_rejected() {
        let cfg = config();
        let encoded = BASE64.encode("admin:wrong");
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());
        assert!(!is_authenticated(&headers, &cfg));
    }

    #[test]
    fn test_no_credentials_rejected() {
        let cfg = config();
        assert!(!is_authenticated(&HeaderMap::new(), &cfg));
    }
}
