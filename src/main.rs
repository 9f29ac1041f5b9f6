// src/main.rs
use anyhow::{Context, Result};
use exam_health::{
    config,
    health::HealthAggregator,
    metrics::MetricsRegistry,
    server::{RequestHandler, ServerBuilder},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exam_health=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration; the file is optional, env vars override it
    let config_path = std::env::args().nth(1);

    info!(
        "Loading configuration from: {}",
        config_path.as_deref().unwrap_or(config::DEFAULT_CONFIG_PATH)
    );
    let config = config::load_layered(config_path.as_deref()).await?;

    info!(
        timeout_ms = config.health.timeout_ms,
        cache_ttl_ms = config.health.cache_ttl_ms,
        "Health check settings"
    );

    let registry = if config.server.metrics_enabled {
        Some(Arc::new(MetricsRegistry::new()?))
    } else {
        None
    };
    let metrics = registry.as_ref().map(|r| r.collector());

    let health = HealthAggregator::from_config(&config, metrics)
        .context("Failed to build dependency probes")?;

    let mut handler = RequestHandler::new(health).with_health_path(&config.server.health_path);
    if let Some(registry) = registry {
        handler = handler.with_metrics(registry, &config.server.metrics_path);
    }

    let addr: SocketAddr = config.server.bind_address.parse()?;
    info!("Starting health service on {}", addr);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .with_drain_timeout(config.server.shutdown_timeout())
        .serve()
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
