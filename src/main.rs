use std::sync::Arc;

use clap::Parser;

use tenant_identity::app_data::AppData;
use tenant_identity::cli::{execute_command, Cli};
use tenant_identity::config::{init_database, init_logging, IdentitySettings, SecretManager, SystemEnvironment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&SystemEnvironment)?;

    let settings = IdentitySettings::from_env()?;
    let secret_manager = SecretManager::init(&SystemEnvironment)?;
    tracing::debug!(?settings, ?secret_manager, "Configuration loaded");

    // Connect and run migrations
    let db = init_database(&settings).await?;

    let (app_data, jobs) = AppData::init(db, settings, secret_manager);

    execute_command(cli, Arc::new(app_data), jobs).await
}
