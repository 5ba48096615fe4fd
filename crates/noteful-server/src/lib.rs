//! HTTP surface for the Noteful note store: an axum router over the storage
//! traits, plus the validation and delete-cascade layers the handlers share.

pub mod cascade;
pub mod rest;
pub mod state;
pub mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use noteful_storage::SqliteStore;

pub use crate::rest::create_router;
pub use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: PathBuf::from("noteful.sqlite"),
        }
    }
}

/// Open the database, build the router, and serve until the process exits.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    let state = Arc::new(AppState::new(store));
    let router = create_router(state);

    if !is_loopback(&config.bind_host) {
        tracing::warn!(
            host = %config.bind_host,
            "binding to a non-loopback address; the API has no authentication"
        );
    }

    let addr = format!("{}:{}", config.bind_host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, db = %config.db_path.display(), "noteful listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "localhost" | "::1")
}
