//! Serve command - runs the gateway with its operational endpoints

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::create_router_with_state;
use crate::config::AppConfig;
use crate::infrastructure::observability::init_metrics;

/// Run the gateway until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let metrics = init_metrics(&config.metrics);

    let gateway = crate::create_gateway_with_config(&config).await?;
    if let Some(directory) = &config.models.directory {
        let loaded = gateway.load_models(Path::new(directory)).await?;
        info!(directory = %directory, loaded, "Semantic models loaded");
    }

    let shutdown = CancellationToken::new();
    let sweeper = gateway
        .pool
        .clone()
        .spawn_sweeper(config.pool.sweep_interval(), shutdown.clone());

    let app = create_router_with_state(
        gateway.app_state(),
        metrics.map(|m| (m, config.metrics.path.clone())),
    );

    let addr = build_socket_addr(&config)?;
    info!("Starting gateway on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    sweeper.await?;
    gateway.shutdown().await;

    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
