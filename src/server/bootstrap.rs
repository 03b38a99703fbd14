use crate::config::GatewayConfig;
use crate::counter_store::memory::InMemoryCounterStore;
use crate::counter_store::redis_store::RedisCounterStore;
use crate::counter_store::CounterStore;
use crate::server;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: PathBuf,
    pub listen: String,
}

/// Gateway lifecycle: init → connect → serve → shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = GatewayConfig::load(&args.config_path)?;
    let listen = if args.listen.is_empty() { config.bind_addr.clone() } else { args.listen.clone() };

    let counter_store = connect_counter_store(&config)
        .await
        .context("failed to connect to the configured counter store")?;

    let state = server::GatewayState::new(config, counter_store).await?;

    let shutdown = Arc::new(Notify::new());

    tracing::info!("server: starting gateway, listen={}", listen);
    let server_handle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move { server::run(&listen, state, shutdown).await }
    });

    wait_for_shutdown(&shutdown).await;

    if let Err(e) = server_handle.await {
        tracing::error!("server: task error: {}", e);
    }

    tracing::info!("server: shutdown complete");
    Ok(())
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

/// `memory://` (or an empty URL) keeps counters in-process — fine for a
/// single-instance deployment or tests. Anything else is treated as a Redis
/// URL; a dead Redis at boot is fatal, since rate limiting silently
/// no-opping would be worse than failing to start.
async fn connect_counter_store(config: &GatewayConfig) -> Result<Arc<dyn CounterStore>> {
    if config.counter_store_url.is_empty() || config.counter_store_url.starts_with("memory://") {
        tracing::info!("counter_store: using in-process store");
        return Ok(Arc::new(InMemoryCounterStore::new()));
    }

    tracing::info!("counter_store: connecting, url={}", redact(&config.counter_store_url));
    let store = RedisCounterStore::connect(&config.counter_store_url)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(Arc::new(store))
}

fn redact(url: &str) -> String {
    match url.find('@') {
        Some(at) => match url.find("://") {
            Some(scheme_end) => format!("{}://***{}", &url[..scheme_end], &url[at..]),
            None => "***".to_string(),
        },
        None => url.to_string(),
    }
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
