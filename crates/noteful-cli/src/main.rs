use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "noteful", version, about = "Noteful note-taking API server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "~/.noteful/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
        /// Override the configured database path.
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand)]
enum DbCommand {
    /// Create the database file and apply migrations.
    Init {
        /// Override the configured database path.
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Reclaim unused space.
    Vacuum,
    /// Run a database integrity check.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, db } => commands::serve::run(port, db, &cli.config).await,
        Command::Db { command } => match command {
            DbCommand::Init { db } => commands::db::init(db, &cli.config),
            DbCommand::Vacuum => commands::db::vacuum(&cli.config),
            DbCommand::Check => commands::db::check(&cli.config),
        },
    }
}
