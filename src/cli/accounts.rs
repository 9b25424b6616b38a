// Account management CLI commands

use std::sync::Arc;

use crate::app_data::AppData;
use crate::coordinators::AccountCoordinator;
use crate::types::internal::{Account, RequestContext};

/// Arguments of `create-account`
#[derive(Debug)]
pub struct CreateAccountRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
    pub password: Option<String>,
}

/// Create an account and print any advisories raised while saving it
pub async fn create_account(
    app_data: Arc<AppData>,
    request: CreateAccountRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::for_cli("create_account");
    let accounts = AccountCoordinator::new(app_data);

    let mut account = Account::new(request.email.trim()).with_roles(request.roles);
    account.first_name = request.first_name;
    account.last_name = request.last_name;
    if let Some(password) = request.password {
        account = account.with_password(password);
    }

    let outcome = accounts.insert_with_default_roles(&ctx, account).await?;
    let created = outcome.value;

    println!("✓ Created {} ({})", created.name, created.user_type);
    if !created.roles.is_empty() {
        println!("  Roles: {}", created.roles.join(", "));
    }
    for advisory in &outcome.advisories {
        println!("  ⚠️  {}", advisory);
    }

    Ok(())
}

/// Disable an account
pub async fn disable_account(app_data: Arc<AppData>, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::for_cli("disable_account");
    let accounts = AccountCoordinator::new(app_data);

    let outcome = accounts.set_enabled(&ctx, name, false).await?;

    println!("✓ Disabled {}; active sessions were ended", outcome.value.name);
    for advisory in &outcome.advisories {
        println!("  ⚠️  {}", advisory);
    }

    Ok(())
}
