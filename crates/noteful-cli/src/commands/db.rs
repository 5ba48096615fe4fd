//! Database maintenance commands.

use std::path::{Path, PathBuf};

use anyhow::Result;

use noteful_storage::SqliteStore;

/// Create the database file and bring the schema up to date. Safe to run on
/// an existing database.
pub fn init(db: Option<PathBuf>, config_path: &str) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(db) = db {
        config.db_path = db;
    }

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    SqliteStore::open(&config.db_path)?;
    println!("Database ready: {}", config.db_path.display());
    Ok(())
}

/// Run VACUUM to reclaim space.
pub fn vacuum(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let db_path = &config.db_path;

    if !db_path.exists() {
        println!("Database not found: {}", db_path.display());
        return Ok(());
    }

    let size_before = std::fs::metadata(db_path)?.len();

    println!("Running VACUUM on database...");
    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute("VACUUM", [])?;

    let size_after = std::fs::metadata(db_path)?.len();
    let saved = size_before.saturating_sub(size_after);

    println!();
    println!("Vacuum complete:");
    println!("  Before: {}", format_size(size_before));
    println!("  After:  {}", format_size(size_after));
    if saved > 0 {
        println!("  Saved:  {}", format_size(saved));
    }

    Ok(())
}

/// Check database integrity.
pub fn check(config_path: &str) -> Result<()> {
    let config = super::load_config(config_path)?;
    let db_path = &config.db_path;

    if !Path::new(db_path).exists() {
        println!("Database not found: {}", db_path.display());
        return Ok(());
    }

    println!("Checking database integrity...");
    let conn = rusqlite::Connection::open(db_path)?;

    let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    if result == "ok" {
        println!("Database integrity: OK");
    } else {
        println!("Database integrity issues found:");
        println!("{result}");
    }

    Ok(())
}

fn format_size(size: u64) -> String {
    if size > 1024 * 1024 * 1024 {
        format!("{:.2} GB", size as f64 / 1024.0 / 1024.0 / 1024.0)
    } else if size > 1024 * 1024 {
        format!("{:.2} MB", size as f64 / 1024.0 / 1024.0)
    } else if size > 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{size} bytes")
    }
}
