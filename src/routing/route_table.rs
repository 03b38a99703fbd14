use crate::config::RouteConfig;
use crate::proxy::filter::{build_route_filters, Filter};
use crate::rate_limiter::RateLimiter;
use std::sync::Arc;

/// A route, together with the pre-built filter chain that runs for every
/// request matched against it (see `proxy::filter::build_route_filters`).
pub struct CompiledRoute {
    pub config: RouteConfig,
    pub filters: Vec<Filter>,
}

/// Immutable snapshot of the active route set, ordered by prefix length
/// (longest first) so that `lookup` is a linear scan that returns on the
/// first (longest) match.
///
/// A `RouteTable` is rebuilt wholesale on every mutation and published
/// behind an `ArcSwap` by the caller (see `server::state::GatewayState`) —
/// readers always see either the full old table or the full new one.
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Build a table from the active route set. `rate_limiter` and `window`
    /// are shared process-wide; only the per-route `limit` differs.
    pub fn new(routes: &[RouteConfig], rate_limiter: Arc<RateLimiter>, window_secs: u64) -> Self {
        let mut compiled: Vec<CompiledRoute> = routes
            .iter()
            .filter(|r| r.active)
            .map(|r| CompiledRoute {
                config: r.clone(),
                filters: build_route_filters(r, rate_limiter.clone(), window_secs),
            })
            .collect();

        compiled.sort_by(|a, b| b.config.prefix.len().cmp(&a.config.prefix.len()));

        tracing::info!("routing: compiled route table, count={}", compiled.len());
        Self { routes: compiled }
    }

    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    /// Longest-prefix match over the active route set. Prefixes are unique
    /// among active configs, so there is never a tie to break.
    pub fn lookup(&self, path: &str) -> Option<&CompiledRoute> {
        self.routes
            .iter()
            .find(|r| path.starts_with(r.config.prefix.as_str()))
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &RouteConfig> {
        self.routes.iter().map(|r| &r.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_store::memory::InMemoryCounterStore;

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(Arc::new(InMemoryCounterStore::new())))
    }

    fn route(prefix: &str) -> RouteConfig {
        RouteConfig::new(prefix, "http://upstream.local")
    }

    #[test]
    fn test_longest_prefix_wins() {
        let routes = vec![route("/api"), route("/api/v1")];
        let table = RouteTable::new(&routes, limiter(), 60);
        let matched = table.lookup("/api/v1/users").unwrap();
        assert_eq!(matched.config.prefix, "/api/v1");
    }

    #[test]
    fn test_exact_prefix_match() {
        let routes = vec![route("/api"), route("/api/v1")];
        let table = RouteTable::new(&routes, limiter(), 60);
        let matched = table.lookup("/api/widgets").unwrap();
        assert_eq!(matched.config.prefix, "/api");
    }

    #[test]
    fn test_no_match_returns_none() {
        let routes = vec![route("/api")];
        let table = RouteTable::new(&routes, limiter(), 60);
        assert!(table.lookup("/other").is_none());
    }

    #[test]
    fn test_inactive_routes_are_excluded() {
        let mut inactive = route("/api/v2");
        inactive.active = false;
        let routes = vec![route("/api"), inactive];
        let table = RouteTable::new(&routes, limiter(), 60);
        assert_eq!(table.route_count(), 1);
        let matched = table.lookup("/api/v2/x").unwrap();
        assert_eq!(matched.config.prefix, "/api");
    }

    #[test]
    fn test_lookup_is_pure_across_repeated_calls() {
        let routes = vec![route("/api"), route("/api/v1")];
        let table = RouteTable::new(&routes, limiter(), 60);
        let first = table.lookup("/api/v1/x").map(|r| r.config.prefix.clone());
        let second = table.lookup("/api/v1/x").map(|r| r.config.prefix.clone());
        assert_eq!(first, second);
    }
}
