use std::path::PathBuf;

use anyhow::Result;

pub async fn run(port: Option<u16>, db: Option<PathBuf>, config_path: &str) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(db) = db {
        config.db_path = db;
    }

    println!("starting noteful server...");
    println!("  REST: http://{}:{}", config.bind_host, config.port);
    println!("  DB:   {}", config.db_path.display());

    noteful_server::start_server(config).await
}
