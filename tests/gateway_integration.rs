use bytes::Bytes;
use edge_gateway::config::{GatewayConfig, RouteConfig};
use edge_gateway::counter_store::memory::InMemoryCounterStore;
use edge_gateway::server::GatewayState;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// A trivial upstream that echoes the request path and query as JSON —
/// enough to assert what the gateway actually forwarded.
async fn spawn_echo_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(v) => v,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let svc = service_fn(|req: Request<Incoming>| async move {
                    let path = req.uri().path().to_string();
                    let query = req.uri().query().unwrap_or("").to_string();
                    let body = format!(r#"{{"path":"{path}","query":"{query}"}}"#);
                    Ok::<_, hyper::Error>(
                        Response::builder()
                            .status(200)
                            .body(Full::new(Bytes::from(body)))
                            .unwrap(),
                    )
                });
                let _ = auto::Builder::new(TokioExecutor::new()).serve_connection(io, svc).await;
            });
        }
    });
    format!("http://{addr}")
}

async fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().to_string()
}

async fn spawn_gateway(config: GatewayConfig) -> String {
    let listen = free_addr().await;
    let counter_store = Arc::new(InMemoryCounterStore::new());
    let state = GatewayState::new(config, counter_store).await.unwrap();
    let shutdown = Arc::new(Notify::new());
    let addr = listen.clone();
    tokio::spawn(async move {
        let _ = edge_gateway::server::run(&addr, state, shutdown).await;
    });
    // give the listener a moment to bind before the first request lands.
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://{listen}")
}

fn base_config() -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.admin_username = "admin".to_string();
    cfg.admin_password = "secret".to_string();
    cfg.rate_limit_window_secs = 60;
    cfg
}

#[tokio::test]
async fn scenario_1_rate_limit_allow_allow_deny() {
    let upstream = spawn_echo_upstream().await;
    let mut cfg = base_config();
    cfg.routes.insert("/api/limited".into(), {
        let mut r = RouteConfig::new("/api/limited", &upstream);
        r.rate_limit = 2;
        r
    });
    let gateway = spawn_gateway(cfg).await;

    let client = reqwest::Client::new();
    let url = format!("{gateway}/api/limited/x");

    let r1 = client.get(&url).send().await.unwrap();
    assert_eq!(r1.status(), 200);
    let r2 = client.get(&url).send().await.unwrap();
    assert_eq!(r2.status(), 200);
    let r3 = client.get(&url).send().await.unwrap();
    assert_eq!(r3.status(), 429);
    assert!(r3.headers().contains_key("retry-after"));
    assert_eq!(r3.headers().get("x-ratelimit-limit").unwrap(), "2");
    assert!(r3.headers().contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn scenario_2_unlimited_route_never_denies() {
    let upstream = spawn_echo_upstream().await;
    let mut cfg = base_config();
    cfg.routes.insert("/api/unlimited".into(), RouteConfig::new("/api/unlimited", &upstream));
    let gateway = spawn_gateway(cfg).await;

    let client = reqwest::Client::new();
    let url = format!("{gateway}/api/unlimited/x");
    for _ in 0..5 {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(!resp.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn scenario_3_independent_client_budgets_via_forwarded_for() {
    let upstream = spawn_echo_upstream().await;
    let mut cfg = base_config();
    cfg.routes.insert("/api/limited".into(), {
        let mut r = RouteConfig::new("/api/limited", &upstream);
        r.rate_limit = 2;
        r
    });
    let gateway = spawn_gateway(cfg).await;

    let client = reqwest::Client::new();
    let url = format!("{gateway}/api/limited/x");

    for _ in 0..2 {
        let resp = client.get(&url).header("x-forwarded-for", "1.1.1.1").send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }
    let third = client.get(&url).header("x-forwarded-for", "1.1.1.1").send().await.unwrap();
    assert_eq!(third.status(), 429);

    for _ in 0..2 {
        let resp = client.get(&url).header("x-forwarded-for", "2.2.2.2").send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}

#[tokio::test]
async fn scenario_4_admin_routes_requires_auth() {
    let cfg = base_config();
    let gateway = spawn_gateway(cfg).await;
    let client = reqwest::Client::new();

    let unauth = client.get(format!("{gateway}/admin/routes")).send().await.unwrap();
    assert_eq!(unauth.status(), 401);
    assert_eq!(unauth.headers().get("www-authenticate").unwrap(), "Basic");

    let authed = client
        .get(format!("{gateway}/admin/routes"))
        .basic_auth("admin", Some("secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(authed.status(), 200);
    let body: serde_json::Value = authed.json().await.unwrap();
    assert!(body.get("routes").is_some());
}

#[tokio::test]
async fn scenario_5_put_routes_replaces_and_clears_counters() {
    let upstream = spawn_echo_upstream().await;
    let mut cfg = base_config();
    cfg.routes.insert("/old".into(), RouteConfig::new("/old", &upstream));
    let gateway = spawn_gateway(cfg).await;
    let client = reqwest::Client::new();

    let mut new_routes = BTreeMap::new();
    new_routes.insert(
        "/api/a".to_string(),
        serde_json::json!({"target_url": upstream, "rate_limit": 5, "url_rewrite": [], "active": true}),
    );

    let put_resp = client
        .put(format!("{gateway}/admin/routes"))
        .basic_auth("admin", Some("secret"))
        .json(&new_routes)
        .send()
        .await
        .unwrap();
    assert_eq!(put_resp.status(), 200);

    let get_resp = client
        .get(format!("{gateway}/admin/routes"))
        .basic_auth("admin", Some("secret"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = get_resp.json().await.unwrap();
    let routes = body.get("routes").unwrap().as_object().unwrap();
    assert_eq!(routes.len(), 1);
    assert!(routes.contains_key("/api/a"));
    assert!(!routes.contains_key("/old"));
}

#[tokio::test]
async fn scenario_6_url_rewrite_forwards_rewritten_path_and_query() {
    let upstream = spawn_echo_upstream().await;
    let mut cfg = base_config();
    cfg.routes.insert("/api/svc".into(), {
        let mut r = RouteConfig::new("/api/svc", &upstream);
        r.url_rewrite = vec![("/api/svc".to_string(), "/internal".to_string())];
        r
    });
    let gateway = spawn_gateway(cfg).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{gateway}/api/svc/users?x=1")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["path"], "/internal/users");
    assert_eq!(body["query"], "x=1");

    let metrics_resp = client
        .get(format!("{gateway}/admin/metrics"))
        .basic_auth("admin", Some("secret"))
        .send()
        .await
        .unwrap();
    let metrics: serde_json::Value = metrics_resp.json().await.unwrap();
    assert!(metrics.get("/api/svc/users").is_some(), "metrics should bucket by the original inbound path");
}
