use chrono::{Duration, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::{connect_store, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::Organization;
use crate::services::organization_service::{find_orphans, purge_orphans};

#[derive(Subcommand)]
pub enum OrphanCommands {
    #[command(about = "List organizations that have no users")]
    List {
        #[arg(long, default_value_t = 10, help = "Only organizations older than this many minutes")]
        older_than_minutes: i64,
    },

    #[command(about = "Delete organizations that have no users")]
    Purge {
        #[arg(long, default_value_t = 10, help = "Only organizations older than this many minutes")]
        older_than_minutes: i64,
    },
}

pub async fn handle(cmd: OrphanCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let admin = store.admin();

    match cmd {
        OrphanCommands::List { older_than_minutes } => {
            let orphans = find_orphans(&admin, cutoff(older_than_minutes)?).await?;
            if orphans.is_empty() {
                return output_empty_collection(&output_format, "organizations", "No orphaned organizations");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "organizations": orphans }))?);
                }
                OutputFormat::Text => {
                    print_table(&orphans);
                }
            }
            Ok(())
        }

        OrphanCommands::Purge { older_than_minutes } => {
            let removed = purge_orphans(&admin, cutoff(older_than_minutes)?).await?;
            if let OutputFormat::Text = output_format {
                print_table(&removed);
            }
            output_success(
                &output_format,
                &format!("Removed {} orphaned organization(s)", removed.len()),
                Some(json!({ "organizations": removed })),
            )
        }
    }
}

fn cutoff(older_than_minutes: i64) -> anyhow::Result<chrono::DateTime<Utc>> {
    if older_than_minutes < 0 {
        anyhow::bail!("--older-than-minutes must not be negative");
    }
    Ok(Utc::now() - Duration::minutes(older_than_minutes))
}

fn print_table(orgs: &[Organization]) {
    println!("{:<36}  {:<24}  {:<32}  CREATED", "ID", "SLUG", "EMAIL");
    for org in orgs {
        println!(
            "{:<36}  {:<24}  {:<32}  {}",
            org.id,
            org.slug,
            org.email,
            org.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
