use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_window_secs() -> u64 {
    60
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_counter_store_timeout_secs() -> u64 {
    5
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_counter_store_url() -> String {
    "memory://local".to_string()
}

fn default_profile() -> Profile {
    Profile::Dev
}

/// Deployment profile, mirrors the three-valued knob the control plane reads
/// to decide default CORS origins and log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Profile {
    Test,
    Dev,
    Prod,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Test => write!(f, "TEST"),
            Profile::Dev => write!(f, "DEV"),
            Profile::Prod => write!(f, "PROD"),
        }
    }
}

/// Process-wide gateway configuration. Loaded once at boot via
/// [`GatewayConfig::load`] — a file (if present) merged with environment
/// overrides, then validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub profile: Profile,

    pub admin_username: String,
    pub admin_password: String,
    pub allowed_origins: Vec<String>,

    pub counter_store_url: String,
    #[serde(default = "default_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_counter_store_timeout_secs")]
    pub counter_store_timeout_secs: u64,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Routes present in the config file at boot, merged into the
    /// persistence layer on first start. Empty for a deployment that manages
    /// all routing exclusively through the admin API.
    #[serde(default)]
    pub routes: BTreeMap<String, RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            profile: default_profile(),
            admin_username: String::new(),
            admin_password: String::new(),
            allowed_origins: Vec::new(),
            counter_store_url: default_counter_store_url(),
            rate_limit_window_secs: default_window_secs(),
            counter_store_timeout_secs: default_counter_store_timeout_secs(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            routes: BTreeMap::new(),
        }
    }
}

/// A single routing rule: prefix match, upstream target, rate limit, and
/// an ordered path-rewrite table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Canonical when loaded from the admin API's `{prefix: route}` map —
    /// the map key always overwrites whatever is deserialized here.
    #[serde(default)]
    pub prefix: String,
    pub target_url: String,
    #[serde(default)]
    pub rate_limit: u32,
    #[serde(default)]
    pub url_rewrite: Vec<(String, String)>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RouteConfig {
    pub fn new(prefix: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            target_url: target_url.into(),
            rate_limit: 0,
            url_rewrite: Vec::new(),
            active: true,
        }
    }
}
