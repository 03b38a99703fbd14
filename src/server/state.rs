use crate::config::GatewayConfig;
use crate::counter_store::CounterStore;
use crate::metrics::MetricsTracker;
use crate::proxy::Forwarder;
use crate::rate_limiter::RateLimiter;
use crate::repository::RouteRepository;
use crate::routing::RouteTable;
use anyhow::Result;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Shared gateway state, cheaply cloneable. Route table reads are lock-free
/// via `ArcSwap`; mutations (admin route replace/delete) are serialized
/// through `reload_mu` so a rebuild never races another rebuild.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<ArcSwap<GatewayConfig>>,
    pub route_table: Arc<ArcSwap<RouteTable>>,
    pub repository: Arc<dyn RouteRepository>,
    pub counter_store: Arc<dyn CounterStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<MetricsTracker>,
    pub forwarder: Arc<Forwarder>,
    reload_mu: Arc<Mutex<()>>,
}

impl GatewayState {
    pub async fn new(config: GatewayConfig, counter_store: Arc<dyn CounterStore>) -> Result<Self> {
        let repository: Arc<dyn RouteRepository> = Arc::new(
            crate::repository::InMemoryRouteRepository::new(config.routes.values().cloned().collect()),
        );
        let rate_limiter = Arc::new(RateLimiter::new(counter_store.clone()));
        let forwarder = Arc::new(Forwarder::new(Duration::from_secs(config.upstream_timeout_secs)));

        let active_routes = repository.list_active().await;
        let route_table = RouteTable::new(&active_routes, rate_limiter.clone(), config.rate_limit_window_secs);
        info!("state: initial route table built, routes={}", route_table.route_count());

        Ok(Self {
            config: Arc::new(ArcSwap::new(Arc::new(config))),
            route_table: Arc::new(ArcSwap::new(Arc::new(route_table))),
            repository,
            counter_store,
            rate_limiter,
            metrics: Arc::new(MetricsTracker::new()),
            forwarder,
            reload_mu: Arc::new(Mutex::new(())),
        })
    }

    /// Rebuild the route table from the repository's active set and publish
    /// it. Called after every admin mutation (`PUT`/`DELETE /admin/routes`).
    pub async fn reload(&self) {
        let _guard = self.reload_mu.lock().await;
        let config = self.config.load();
        let active_routes = self.repository.list_active().await;
        let new_table = RouteTable::new(&active_routes, self.rate_limiter.clone(), config.rate_limit_window_secs);
        info!("state: route table reloaded, routes={}", new_table.route_count());
        self.route_table.store(Arc::new(new_table));
    }
}
