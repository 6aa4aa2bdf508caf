use anyhow::Context;
use nq_api::{config::ApiConfig, metrics, router, state::ApiState, tracing::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env().context("invalid configuration")?;

    init_tracing(&config.env);

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let state = ApiState::new(&config).await?;
    let app = router::app(state, &config.allowed_origins(), metrics_handle);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
