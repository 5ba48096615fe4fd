pub mod db;
pub mod serve;

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use noteful_server::ServerConfig;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<FileServerConfig>,
    storage: Option<FileStorageConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServerConfig {
    bind_host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FileStorageConfig {
    db_path: Option<String>,
}

/// Load the server config: defaults, overridden by the TOML file if it
/// exists, overridden by environment variables. A missing config file is not
/// an error.
pub fn load_config(config_path: &str) -> anyhow::Result<ServerConfig> {
    let path = shellexpand(config_path);
    let mut config = ServerConfig::default();

    if std::path::Path::new(&path).exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let file_config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse TOML config {path}"))?;

        if let Some(server) = file_config.server {
            if let Some(bind_host) = server.bind_host {
                config.bind_host = bind_host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
        }

        if let Some(storage) = file_config.storage {
            if let Some(db_path) = storage.db_path {
                config.db_path = PathBuf::from(shellexpand(&db_path));
            }
        }
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = std::env::var("NOTEFUL_BIND_HOST") {
        if !value.is_empty() {
            config.bind_host = value;
        }
    }

    if let Some(port) = parse_env::<u16>("NOTEFUL_PORT") {
        config.port = port;
    }

    if let Ok(value) = std::env::var("NOTEFUL_DB_PATH") {
        if !value.is_empty() {
            config.db_path = PathBuf::from(shellexpand(&value));
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }

    raw.parse().ok()
}

pub fn shellexpand(s: &str) -> String {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/{rest}");
        }
    }
    s.to_string()
}
