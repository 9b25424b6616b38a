use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::ConnectionTrait;

use crate::errors::internal::ResetError;
use crate::errors::InternalError;
use crate::providers::CryptoProvider;
use crate::stores::AccountStore;
use crate::types::internal::Account;

const RESET_KEY_LENGTH: usize = 32;

/// A freshly issued reset token and the link that redeems it
#[derive(Debug, Clone)]
pub struct ResetLink {
    pub key: String,
    pub url: String,
}

/// Issues and resolves single-use password reset tokens
pub struct ResetTokenProvider {
    account_store: Arc<AccountStore>,
    crypto: CryptoProvider,
    site_url: String,
    ttl: Duration,
}

impl ResetTokenProvider {
    pub fn new(account_store: Arc<AccountStore>, site_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            account_store,
            crypto: CryptoProvider::new(),
            site_url: site_url.into(),
            ttl,
        }
    }

    /// Store a new token for the account, replacing any previous one
    pub async fn issue(&self, conn: &impl ConnectionTrait, account: &str) -> Result<ResetLink, InternalError> {
        let key = self.crypto.random_string(RESET_KEY_LENGTH);
        self.account_store
            .set_reset_key(conn, account, &key, Utc::now().timestamp())
            .await?;

        tracing::info!(account = %account, "Issued password reset token");

        Ok(ResetLink {
            url: format!("{}/update-password?key={}", self.site_url, key),
            key,
        })
    }

    /// The account holding `key`, unless the token is unknown or expired
    pub async fn resolve(&self, conn: &impl ConnectionTrait, key: &str) -> Result<Account, InternalError> {
        if key.is_empty() {
            return Err(ResetError::ExpiredOrInvalidLink.into());
        }

        let account = self
            .account_store
            .find_by_reset_key(conn, key)
            .await?
            .ok_or(ResetError::ExpiredOrInvalidLink)?;

        let issued_at = account.reset_key_issued_at.unwrap_or(0);
        if Utc::now().timestamp() > issued_at + self.ttl.as_secs() as i64 {
            tracing::info!(account = %account.name, "Rejected expired reset token");
            return Err(ResetError::ExpiredOrInvalidLink.into());
        }

        Ok(account)
    }

    /// Resolve `key` and take it off the account in one conditional write
    ///
    /// Of several concurrent callers holding the same key only one succeeds;
    /// the rest fail with `ExpiredOrInvalidLink`.
    pub async fn consume(&self, conn: &impl ConnectionTrait, key: &str) -> Result<Account, InternalError> {
        let account = self.resolve(conn, key).await?;

        if !self.account_store.consume_reset_key(conn, &account.name, key).await? {
            tracing::info!(account = %account.name, "Reset token already used");
            return Err(ResetError::ExpiredOrInvalidLink.into());
        }

        Ok(account)
    }
}
