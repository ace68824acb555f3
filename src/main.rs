use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use storefront_api::{config, database, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the config singleton is first touched
    let _ = dotenvy::dotenv();
    storefront_api::init_tracing();

    let config = config::config();
    config.validate().map_err(anyhow::Error::msg)?;
    info!("Starting Storefront API in {:?} mode", config.environment);

    let store = database::connect(&config.store)
        .await
        .context("failed to open the document store")?;
    let app = routes::app(AppState::new(store));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Storefront API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
