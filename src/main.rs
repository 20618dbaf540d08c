use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use expedientes_api::app::{app, AppState};
use expedientes_api::config;
use expedientes_api::database::{schema, DatabaseManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Expedientes API in {:?} mode", config.environment);

    let state = if config.database.url.is_some() {
        let pool = DatabaseManager::main_pool().await.context("connecting to database")?;
        schema::bootstrap(&pool).await.context("bootstrapping schema")?;
        AppState::postgres(pool)
    } else if expedientes_api::is_development!() {
        tracing::warn!("DATABASE_URL not set, using in-memory record store");
        AppState::in_memory()
    } else {
        anyhow::bail!("DATABASE_URL is required outside development");
    };
    state.profiles.seed_system_profiles().await.context("seeding system profiles")?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Expedientes API listening on http://{}", bind_addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    DatabaseManager::close_all().await;
    Ok(())
}
