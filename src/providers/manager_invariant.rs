use std::sync::Arc;

use sea_orm::ConnectionTrait;

use crate::errors::internal::AccountError;
use crate::errors::InternalError;
use crate::stores::AccountStore;
use crate::types::internal::account::SYSTEM_MANAGER;
use crate::types::internal::Account;

/// At least one enabled System User other than Administrator holds System Manager
///
/// Callers run the check on the same transaction that performs the write.
pub struct ManagerInvariant {
    account_store: Arc<AccountStore>,
}

impl ManagerInvariant {
    pub fn new(account_store: Arc<AccountStore>) -> Self {
        Self { account_store }
    }

    /// Whether the account currently counts towards the invariant
    pub fn is_manager(account: &Account) -> bool {
        account.enabled && account.is_system_user() && account.holds(SYSTEM_MANAGER)
    }

    /// Fail with `LastManager` unless some account other than `account` keeps the role
    pub async fn ensure_manager_remains(
        &self,
        conn: &impl ConnectionTrait,
        account: &str,
    ) -> Result<(), InternalError> {
        let others = self.account_store.other_system_managers(conn, account).await?;
        if others.is_empty() {
            tracing::warn!(account = %account, "Refused change that would leave no System Manager");
            return Err(AccountError::LastManager.into());
        }
        Ok(())
    }

    /// Guard a save that may demote an existing manager
    pub async fn ensure_not_demoting_last(
        &self,
        conn: &impl ConnectionTrait,
        before: &Account,
        after: &Account,
    ) -> Result<(), InternalError> {
        if Self::is_manager(before) && !Self::is_manager(after) {
            self.ensure_manager_remains(conn, &after.name).await?;
        }
        Ok(())
    }
}
