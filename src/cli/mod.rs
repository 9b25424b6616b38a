// CLI module for administrative operations against the tenant database

pub mod accounts;
pub mod bootstrap;
pub mod newsletter;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use crate::app_data::AppData;
use crate::types::internal::QueuedJob;

/// Tenant identity CLI for administrative operations
#[derive(Parser)]
#[command(name = "tenant-identity")]
#[command(about = "Tenant account lifecycle and newsletter dispatch", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the standard roles and the Administrator and Guest accounts
    Bootstrap,

    /// Create an account
    CreateAccount {
        /// Email address; also the account's identity key
        email: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Role to grant; repeat for several
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Initial password; without it a verification link is mailed
        #[arg(long)]
        password: Option<String>,
    },

    /// Disable an account and end its sessions
    DisableAccount {
        name: String,
    },

    /// Send a newsletter to its email group
    SendNewsletter {
        subject: String,

        /// Go through the task queue instead of sending inline
        #[arg(long)]
        queue: bool,
    },

    /// Run the background worker until interrupted
    Worker,
}

/// Execute CLI command
///
/// Routes the parsed CLI command to the appropriate handler function.
///
/// # Arguments
/// * `cli` - Parsed CLI arguments
/// * `app_data` - Application data containing all stores and collaborators
/// * `jobs` - Receiving end of the in-process task queue
///
/// # Returns
/// * `Ok(())` - Command executed successfully
/// * `Err(...)` - Command execution failed
pub async fn execute_command(
    cli: Cli,
    app_data: Arc<AppData>,
    jobs: mpsc::UnboundedReceiver<QueuedJob>,
) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Bootstrap => {
            bootstrap::bootstrap_system(app_data).await?;
        }
        Commands::CreateAccount {
            email,
            first_name,
            last_name,
            roles,
            password,
        } => {
            let request = accounts::CreateAccountRequest {
                email,
                first_name,
                last_name,
                roles,
                password,
            };
            accounts::create_account(app_data, request).await?;
        }
        Commands::DisableAccount { name } => {
            accounts::disable_account(app_data, &name).await?;
        }
        Commands::SendNewsletter { subject, queue } => {
            newsletter::send_newsletter(app_data, jobs, &subject, queue).await?;
        }
        Commands::Worker => {
            newsletter::run_worker(app_data, jobs).await?;
        }
    }

    Ok(())
}
