pub mod commands;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, StoreBackendKind};
use crate::database::{DatabaseManager, PgStore, Store};

#[derive(Parser)]
#[command(name = "dentcare")]
#[command(about = "DentCare operator CLI - database and tenant maintenance")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create a system-level owner account")]
    BootstrapOwner(commands::owner::BootstrapOwnerArgs),

    #[command(about = "Find and remove organizations that have no users")]
    Orphans {
        #[command(subcommand)]
        cmd: commands::orphans::OrphanCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Migrate => commands::migrate::handle(&config, output_format).await,
        Commands::BootstrapOwner(args) => commands::owner::handle(args, &config, output_format).await,
        Commands::Orphans { cmd } => commands::orphans::handle(cmd, &config, output_format).await,
    }
}

/// Open the configured Postgres database; operator commands never run against the memory store
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseManager> {
    if config.store.backend != StoreBackendKind::Postgres {
        anyhow::bail!("Operator commands require STORE_BACKEND=postgres");
    }
    Ok(DatabaseManager::connect(&config.store).await?)
}

pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<Store> {
    let db = connect(config).await?;
    Ok(Store::new(Arc::new(PgStore::new(db))))
}
