use std::net::SocketAddr;

use anyhow::Context;
use jobboard::{
    auth::PasswordHasher,
    config::AppConfig,
    create_app,
    store::{self, seed},
    telemetry, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;
    let store = store::connect(&config).await.context("failed to open the store")?;
    let hasher = PasswordHasher::new();

    if config.seed_on_start {
        seed::seed(store.as_ref(), &hasher).await.context("failed to load seed data")?;
    }

    let addr = config.socket_addr();
    let app = create_app(AppState::new(store, hasher, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server running on http://{}", addr);
    tracing::info!("API docs on http://{}/docs", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
