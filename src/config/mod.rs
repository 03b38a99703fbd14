pub mod types;


pub use types::*;

use anyhow::Result;
use std::path::Path;

impl GatewayConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used — allowing the gateway to start with zero configuration for
    /// local development (profile `DEV`, in-process counter store).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: GatewayConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            GatewayConfig::default()
        };

        for (prefix, route) in config.routes.iter_mut() {
            route.prefix = prefix.clone();
        }
        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(profile = %config.profile, "loaded gateway configuration");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GATEWAY_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_PROFILE") {
            self.profile = match v.to_uppercase().as_str() {
                "TEST" => Profile::Test,
                "PROD" => Profile::Prod,
                _ => Profile::Dev,
            };
        }
        if let Ok(v) = std::env::var("GATEWAY_ADMIN_USERNAME") {
            self.admin_username = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_ADMIN_PASSWORD") {
            self.admin_password = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_ALLOWED_ORIGINS") {
            self.allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("GATEWAY_COUNTER_STORE_URL") {
            self.counter_store_url = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_RATE_LIMIT_WINDOW_SECS") {
            if let Ok(n) = v.parse() {
                self.rate_limit_window_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_COUNTER_STORE_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.counter_store_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_UPSTREAM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.upstream_timeout_secs = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin_username.is_empty() || self.admin_password.is_empty() {
            anyhow::bail!("admin_username and admin_password must both be set (config file or GATEWAY_ADMIN_USERNAME/GATEWAY_ADMIN_PASSWORD)");
        }
        if self.rate_limit_window_secs == 0 {
            anyhow::bail!("rate_limit_window_secs must be non-zero");
        }
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("bind_addr is not a valid socket address: {}", self.bind_addr);
        }
        for route in self.routes.values() {
            if !route.prefix.starts_with('/') {
                anyhow::bail!("route prefix must begin with '/': {}", route.prefix);
            }
        }
        Ok(())
    }
}
