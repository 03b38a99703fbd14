use crate::config::RouteConfig;
use async_trait::async_trait;
use dashmap::DashMap;

/// Storage for routes managed through the admin API, independent of the
/// boot-time config file. `list_active` feeds `RouteTable` rebuilds;
/// `replace_active` is the admin API's bulk-replace write path — any
/// existing route whose prefix is absent from the new set is deactivated,
/// never removed; `soft_delete` marks a single route inactive the same way
/// (so `GET /admin/routes` can still list it with `active: false`).
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn list_all(&self) -> Vec<RouteConfig>;
    async fn list_active(&self) -> Vec<RouteConfig> {
        self.list_all().await.into_iter().filter(|r| r.active).collect()
    }
    async fn replace_active(&self, routes: Vec<RouteConfig>);
    async fn soft_delete(&self, prefix: &str) -> bool;
}

/// Process-local route store, keyed by prefix. The boot-time config's
/// `routes` table seeds it; the admin API owns it from then on.
pub struct InMemoryRouteRepository {
    routes: DashMap<String, RouteConfig>,
}

impl InMemoryRouteRepository {
    pub fn new(seed: Vec<RouteConfig>) -> Self {
        let routes = DashMap::new();
        for route in seed {
            routes.insert(route.prefix.clone(), route);
        }
        Self { routes }
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn list_all(&self) -> Vec<RouteConfig> {
        self.routes.iter().map(|entry| entry.value().clone()).collect()
    }

    async fn replace_active(&self, routes: Vec<RouteConfig>) {
        let incoming: std::collections::HashSet<String> =
            routes.iter().map(|r| r.prefix.clone()).collect();
        for mut entry in self.routes.iter_mut() {
            if !incoming.contains(entry.key()) {
                entry.value_mut().active = false;
            }
        }
        for route in routes {
            self.routes.insert(route.prefix.clone(), route);
        }
    }

    async fn soft_delete(&self, prefix: &str) -> bool {
        match self.routes.get_mut(prefix) {
            Some(mut route) => {
                route.active = false;
                true
            }
            None => false,
        }
    }
}
