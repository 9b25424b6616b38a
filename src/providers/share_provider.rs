use std::sync::Arc;

use sea_orm::ConnectionTrait;

use crate::errors::internal::AccountError;
use crate::errors::InternalError;
use crate::stores::{ShareRights, ShareStore};
use crate::types::internal::Account;

/// Doctype under which account records are shared
pub const ACCOUNT_DOCTYPE: &str = "User";

/// Keeps each account's share of its own record in line with its user type
pub struct ShareProvider {
    share_store: Arc<ShareStore>,
}

impl ShareProvider {
    pub fn new(share_store: Arc<ShareStore>) -> Self {
        Self { share_store }
    }

    /// System Users get full access to their own record; Website Users lose it
    pub async fn sync_self_share(&self, conn: &impl ConnectionTrait, account: &Account) -> Result<(), InternalError> {
        if account.is_system_user() {
            self.share_store
                .upsert(
                    conn,
                    ACCOUNT_DOCTYPE,
                    &account.name,
                    &account.name,
                    ShareRights::full(),
                    &account.name,
                )
                .await
        } else {
            self.share_store
                .remove(conn, ACCOUNT_DOCTYPE, &account.name, &account.name)
                .await
                .map(|_| ())
        }
    }

    /// Reject share grants an account may not hold on its own record
    pub fn validate_self_share(account: &Account, grantee: &str, rights: ShareRights) -> Result<(), InternalError> {
        if grantee != account.name {
            return Ok(());
        }
        if !account.is_system_user() {
            return Err(AccountError::validation("share", "sharing with a Website User is prohibited").into());
        }
        if !rights.share {
            return Err(
                AccountError::validation("share", "an account must have complete access to its own record").into(),
            );
        }
        Ok(())
    }
}
