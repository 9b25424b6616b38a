use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::app_data::AppData;
use crate::collaborators::{MailDispatcher, PasswordStore, SessionManager};
use crate::config::IdentitySettings;
use crate::errors::internal::{AccountError, ResetError};
use crate::errors::InternalError;
use crate::providers::{CacheProvider, ResetTokenProvider, ACCOUNT_DOCTYPE};
use crate::stores::AccountStore;
use crate::types::internal::account::ADMINISTRATOR;
use crate::types::internal::{Account, OutboundMail, RequestContext};

/// Where a successful redemption sends the now signed-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub account: String,
    pub redirect_to: String,
}

/// Password reset coordinator
///
/// Issues reset links and redeems them (or the current password) for a new
/// password, then signs the account in.
pub struct PasswordResetCoordinator {
    db: DatabaseConnection,
    settings: Arc<IdentitySettings>,
    account_store: Arc<AccountStore>,
    reset_tokens: ResetTokenProvider,
    cache: Arc<CacheProvider>,
    password_store: Arc<dyn PasswordStore>,
    mail: Arc<dyn MailDispatcher>,
    sessions: Arc<dyn SessionManager>,
}

impl PasswordResetCoordinator {
    pub fn new(app_data: Arc<AppData>) -> Self {
        let reset_tokens = ResetTokenProvider::new(
            app_data.account_store.clone(),
            app_data.settings.site_url.clone(),
            app_data.settings.reset_token_ttl,
        );

        Self {
            db: app_data.db.clone(),
            settings: app_data.settings.clone(),
            account_store: app_data.account_store.clone(),
            reset_tokens,
            cache: app_data.cache.clone(),
            password_store: app_data.collaborators.password_store.clone(),
            mail: app_data.collaborators.mail.clone(),
            sessions: app_data.collaborators.sessions.clone(),
        }
    }

    /// Set a new password using either a reset key or the current password
    ///
    /// Coordinates the sequence of operations:
    /// 1. Identify the account from exactly one of `key` / `old_password`;
    ///    a key is taken off the account before anything else happens
    /// 2. Store the new password
    /// 3. Clear the reset token and the stored redirect
    /// 4. Establish a session for the account
    /// 5. Pick the landing page: the desk for System Users, else the
    ///    one-time cached redirect, the stored redirect, or "/"
    ///
    /// # Errors
    /// * `Validation` - Empty new password
    /// * `CredentialRequired` - Neither or both of key and old password given
    /// * `ExpiredOrInvalidLink` - Unknown, superseded, expired or already used key
    /// * `InvalidCredentials` - Old password does not match the session account
    pub async fn redeem(
        &self,
        ctx: &RequestContext,
        key: Option<&str>,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<Redemption, InternalError> {
        let key = key.filter(|k| !k.is_empty());
        let old_password = old_password.filter(|p| !p.is_empty());

        if new_password.is_empty() {
            return Err(AccountError::validation("new_password", "password cannot be empty").into());
        }

        // Step 1: Identify the account; a key is consumed here so it redeems once
        let (account, key_consumed) = match (key, old_password) {
            (Some(key), None) => (self.reset_tokens.consume(&self.db, key).await?, true),
            (None, Some(old_password)) => (self.account_for_password(ctx, old_password).await?, false),
            _ => return Err(ResetError::CredentialRequired.into()),
        };

        // Step 2: Store the new password
        self.password_store.set(&account.name, new_password).await?;

        // Step 3: Clear reset state; a cached redirect wins over the stored one
        let stored_redirect = account.redirect_url.clone().filter(|r| !r.is_empty());
        if !key_consumed {
            self.account_store.clear_reset_state(&self.db, &account.name).await?;
        }
        self.cache.invalidate_account(&account.name).await;
        let redirect = self
            .cache
            .take_redirect_after_login(&account.name)
            .await
            .or(stored_redirect);

        // Step 4: Sign in
        self.sessions.establish(&account.name).await?;

        // Step 5: Landing page
        let redirect_to = if account.is_system_user() {
            self.settings.system_user_home.clone()
        } else {
            redirect.unwrap_or_else(|| "/".to_string())
        };

        tracing::info!(account = %account.name, "Password updated, session established");

        Ok(Redemption {
            account: account.name,
            redirect_to,
        })
    }

    async fn account_for_password(&self, ctx: &RequestContext, password: &str) -> Result<Account, InternalError> {
        self.verify_password(ctx, password).await?;
        self.account_store.get(&self.db, &ctx.actor).await
    }

    /// Mail a reset link to the account
    ///
    /// Administrator's password cannot be reset this way.
    pub async fn request_password_reset(&self, name: &str) -> Result<(), InternalError> {
        if name == ADMINISTRATOR {
            return Err(ResetError::ResetNotAllowed(name.to_string()).into());
        }

        let account = self.account_store.get(&self.db, name).await?;
        let link = self.reset_tokens.issue(&self.db, &account.name).await?;
        self.cache.invalidate_account(&account.name).await;

        let body = format!(
            "<p>Dear {},</p>\
             <p>Please click on the following link to set your new password:</p>\
             <p><a href=\"{}\">{}</a></p>",
            account.first_name.as_deref().unwrap_or("user"),
            link.url,
            link.url,
        );
        let mut mail = OutboundMail::new(vec![account.email.clone()], "Password Reset", body);
        mail.reference_doctype = Some(ACCOUNT_DOCTYPE.to_string());
        mail.reference_name = Some(account.name.clone());
        self.mail.send(mail).await?;

        tracing::info!(account = %account.name, "Password reset instructions sent");
        Ok(())
    }

    /// Check `password` against the acting account
    pub async fn verify_password(&self, ctx: &RequestContext, password: &str) -> Result<(), InternalError> {
        if ctx.is_guest() || !self.password_store.verify(&ctx.actor, password).await? {
            tracing::warn!(account = %ctx.actor, "Password verification failed");
            return Err(ResetError::InvalidCredentials.into());
        }
        Ok(())
    }
}
