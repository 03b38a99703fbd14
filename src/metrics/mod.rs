use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const RECENT_REQUESTS_CAP: usize = 100;

/// One recorded request, as surfaced via `GET /admin/metrics`
/// per route.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetric {
    pub timestamp: f64,
    pub status_code: u16,
    pub path: String,
    pub method: String,
    pub client_ip: String,
    pub is_rate_limited: bool,
}

/// Per-path counters plus a bounded ring of recent requests. Invariant:
/// `total_requests == success_count + error_count + rate_limited_count`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RouteMetrics {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub rate_limited_count: u64,
    pub status_codes: HashMap<String, u64>,
    pub recent_requests: VecDeque<RequestMetric>,
}

/// Process-wide, mutex-guarded request tracker bucketed by the *original*
/// (pre-rewrite) inbound path. Admin paths are skipped except
/// `/admin/metrics` itself, so the tracker doesn't track requests about itself.
#[derive(Default)]
pub struct MetricsTracker {
    routes: Mutex<HashMap<String, RouteMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: &str, method: &str, client_ip: &str, status: u16, is_rate_limited: bool) {
        if path.starts_with("/admin") && path != "/admin/metrics" {
            return;
        }

        let mut routes = self.routes.lock().expect("metrics mutex poisoned");
        let metrics = routes.entry(path.to_string()).or_default();

        metrics.total_requests += 1;
        if is_rate_limited {
            metrics.rate_limited_count += 1;
        } else if (200..400).contains(&status) {
            metrics.success_count += 1;
        } else {
            metrics.error_count += 1;
        }

        *metrics.status_codes.entry(status.to_string()).or_insert(0) += 1;

        metrics.recent_requests.push_back(RequestMetric {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            status_code: status,
            path: path.to_string(),
            method: method.to_string(),
            client_ip: client_ip.to_string(),
            is_rate_limited,
        });
        while metrics.recent_requests.len() > RECENT_REQUESTS_CAP {
            metrics.recent_requests.pop_front();
        }
    }

    /// Deep copy of the current state — callers never see internal state.
    pub fn snapshot(&self) -> HashMap<String, RouteMetrics> {
        self.routes.lock().expect("metrics mutex poisoned").clone()
    }
}
