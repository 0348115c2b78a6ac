use clap::Args;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect_store, OutputFormat};
use crate::config::AppConfig;
use crate::services::auth_service::bootstrap_owner;

#[derive(Args)]
pub struct BootstrapOwnerArgs {
    #[arg(long, help = "Display name of the owner")]
    pub name: String,

    #[arg(long, help = "Login email")]
    pub email: String,

    #[arg(long, env = "DENTCARE_OWNER_PASSWORD", hide_env_values = true, help = "Login password (min 6 characters)")]
    pub password: String,
}

pub async fn handle(args: BootstrapOwnerArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let owner = bootstrap_owner(&store, args.name, args.email, args.password).await?;

    output_success(
        &output_format,
        &format!("System owner {} created ({})", owner.email, owner.id),
        Some(json!({ "user": owner })),
    )
}
