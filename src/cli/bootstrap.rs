// Bootstrap command implementation
// Creates the standard roles and accounts during tenant setup

use std::sync::Arc;

use crate::app_data::AppData;
use crate::coordinators::AccountCoordinator;
use crate::types::internal::RequestContext;

/// Bootstrap the tenant
///
/// Safe to run repeatedly; existing roles and accounts are left alone.
///
/// # Returns
/// * `Ok(())` - Standard roles and accounts exist
/// * `Err(...)` - Bootstrap failed
pub async fn bootstrap_system(app_data: Arc<AppData>) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n=== Tenant Bootstrap ===\n");

    let ctx = RequestContext::for_cli("bootstrap");
    let accounts = AccountCoordinator::new(app_data);

    accounts
        .bootstrap_standard_accounts(&ctx)
        .await
        .map_err(|e| format!("Bootstrap failed: {}", e))?;

    println!("✓ Standard roles and accounts are in place");
    println!("  System users: {}", accounts.total_system_users().await?);
    println!("  Assignable roles: {}", accounts.list_assignable_roles().await?.join(", "));

    Ok(())
}
