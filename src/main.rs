//! nethealth - network health monitor
//!
//! Samples connection health on an interval and serves the results as JSON.

use nethealth::config::EngineConfig;
use nethealth::health::HealthEngine;
use nethealth::scheduler::Scheduler;
use nethealth::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("nethealth=info".parse()?))
        .init();

    let cfg = EngineConfig::load();
    tracing::info!("Starting nethealth on port {}...", cfg.http_port);
    tracing::info!("Probing {} (targets: {})", cfg.primary_target, cfg.targets.join(", "));

    let sample_interval = cfg.sample_interval;
    let engine = Arc::new(HealthEngine::new(cfg));

    let scheduler = Scheduler::new(engine.clone());
    match sample_interval {
        Some(interval) => scheduler.start(interval).await,
        None => tracing::info!("Periodic sampling disabled"),
    }

    let server = Server::new(engine.clone());
    let result = server.start(shutdown_signal()).await;

    scheduler.stop().await;
    if let Err(e) = engine.shutdown() {
        tracing::error!("Failed to save history: {}", e);
    }

    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
