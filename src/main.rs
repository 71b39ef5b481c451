//! Simple Bank - Main Application Entry Point
//!
//! REST API server in front of the transfer engine. Authenticated callers
//! create accounts in a supported currency and move money between them.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, or the in-memory store
//! - **Authentication**: HMAC-signed bearer tokens
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the configured store (pool + migrations for PostgreSQL)
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured address

use tracing_subscriber::EnvFilter;

use simple_bank::{
    config::{Config, StoreBackend},
    db,
    router::{AppState, build_router},
    store::{MemoryStore, PgStore, Store},
    token::TokenMaker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let token_maker = TokenMaker::new(&config.token_symmetric_key)?;

    match config.store_backend()? {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

            let pool = db::create_pool(database_url, config.db_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            let store = PgStore::new(pool).with_tx_timeout(config.tx_timeout());
            serve(&config, store, token_maker).await
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            let store = MemoryStore::new().with_tx_timeout(config.tx_timeout());
            serve(&config, store, token_maker).await
        }
    }
}

async fn serve<S: Store>(config: &Config, store: S, token_maker: TokenMaker) -> anyhow::Result<()> {
    let state = AppState::new(store, token_maker).with_overdraft_policy(config.overdraft_policy());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    tracing::info!("Server listening on {}", config.server_address);

    axum::serve(listener, app).await?;

    Ok(())
}
