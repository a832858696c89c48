use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use promptagro_wizard::{
    routes::{router, AppState},
    AppConfig, BackendAdapter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let adapter = BackendAdapter::from_config(&config.api).context("failed to build backend client")?;
    tracing::info!(
        "🌾 Wizard configured: {:?} backend, languages {:?}, failure policy {:?}",
        config.api.backend,
        config.wizard.languages,
        config.wizard.on_failure
    );

    if config.features.debug {
        let probe = adapter.clone();
        tokio::spawn(async move {
            match probe.health().await {
                Ok(health) => tracing::info!("🩺 Backend health: {} {:?}", health.status, health.services),
                Err(e) => tracing::warn!("🩺 Backend health check failed: {}", e),
            }
        });
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(adapter, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "🚀 Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("👋 Shutting down");
}
