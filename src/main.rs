use anyhow::{Context, Result};
use tracing::info;

use game_localization::{api, config::Config, Database};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("game_localization=info".parse()?),
        )
        .init();

    info!("Starting localization service");

    // Load configuration from environment
    let config = Config::from_env()?;

    let db = Database::new(&config.database_url, config.database_max_connections).await?;

    let state = api::AppState::new(db, config.default_page_size, config.max_page_size);
    let app = api::router(state, &config.cors_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("✓ Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
