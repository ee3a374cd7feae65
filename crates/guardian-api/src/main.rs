//! Guardian API server

use guardian_api::{create_router_with_state, telemetry, AppConfig, AppState};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    telemetry::init_tracing(&config.log);
    let metrics = telemetry::init_metrics()?;

    let state = AppState::from_config(&config)?.with_metrics(metrics);
    let connections = state.connections.clone();

    info!(
        workers = state.prompts.worker_pool_size(),
        rate_limit = config.rate_limit.enabled,
        signed_identity = config.auth.shared_secret.is_some(),
        "prompt pipeline ready"
    );

    let app = create_router_with_state(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🛡️ Guardian listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Send endpoint: http://{}/send", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let closed = connections.close_all();
    info!(closed, "Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
