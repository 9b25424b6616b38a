use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tokio::sync::Mutex;

use crate::app_data::AppData;
use crate::collaborators::{MailDispatcher, PasswordStore, SessionManager};
use crate::config::{begin_transaction, commit_transaction, IdentitySettings};
use crate::errors::internal::AccountError;
use crate::errors::InternalError;
use crate::providers::{
    identity_rules, AccountValidator, CacheProvider, CascadeRegistry, ManagerInvariant,
    ResetTokenProvider, RoleRegistry, ShareProvider, ValidateOptions, ValidationReport, ACCOUNT_DOCTYPE,
};
use crate::stores::{AccountStore, ShareRights};
use crate::types::internal::account::{
    is_standard, ADMINISTRATOR, ADMINISTRATOR_ROLE, ALL_ROLE, GUEST, GUEST_ROLE, SYSTEM_MANAGER,
};
use crate::types::internal::{Account, ActionOutcome, Advisory, OutboundMail, RequestContext};

const SIGNUP_WINDOW_SECS: i64 = 3600;

/// Result of a self-service sign-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    AlreadyRegistered,
    RegisteredButDisabled,
    /// Too many accounts changed in the last hour; nothing was created
    SignupsThrottled,
    /// Account created and a verification link was mailed
    VerificationSent,
    /// Account created but no mail went out; an administrator has to step in
    PendingApproval,
}

impl SignUpOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SignUpOutcome::AlreadyRegistered => "Already Registered",
            SignUpOutcome::RegisteredButDisabled => "Registered but disabled",
            SignUpOutcome::SignupsThrottled => {
                "Too many users signed up recently, so the registration is disabled. Please try back in an hour"
            }
            SignUpOutcome::VerificationSent => "Please check your email for verification",
            SignUpOutcome::PendingApproval => "Please ask your administrator to verify your sign-up",
        }
    }
}

/// Account coordinator that orchestrates the account lifecycle
///
/// Every mutation follows the same shape:
/// 1. Take the process-wide write guard
/// 2. Open a transaction and load the committed state
/// 3. Run the validation pipeline and write
/// 4. Re-check quota and sync the self share inside the same transaction
/// 5. Commit, then talk to collaborators (passwords, sessions, mail)
pub struct AccountCoordinator {
    db: DatabaseConnection,
    settings: Arc<IdentitySettings>,
    account_store: Arc<AccountStore>,
    role_registry: Arc<RoleRegistry>,
    validator: AccountValidator,
    manager_invariant: Arc<ManagerInvariant>,
    share_provider: ShareProvider,
    reset_tokens: ResetTokenProvider,
    cascade_registry: Arc<CascadeRegistry>,
    cache: Arc<CacheProvider>,
    password_store: Arc<dyn PasswordStore>,
    mail: Arc<dyn MailDispatcher>,
    sessions: Arc<dyn SessionManager>,
    write_guard: Arc<Mutex<()>>,
}

impl AccountCoordinator {
    /// Create AccountCoordinator from AppData
    ///
    /// Extracts stores and collaborators from AppData and creates providers internally.
    pub fn new(app_data: Arc<AppData>) -> Self {
        // Step 1: Create providers from AppData components
        let manager_invariant = Arc::new(ManagerInvariant::new(app_data.account_store.clone()));

        let validator = AccountValidator::new(
            app_data.settings.clone(),
            app_data.account_store.clone(),
            app_data.role_registry.clone(),
            manager_invariant.clone(),
            app_data.default_roles.clone(),
            app_data.collaborators.quota.clone(),
            app_data.collaborators.avatars.clone(),
        );

        let reset_tokens = ResetTokenProvider::new(
            app_data.account_store.clone(),
            app_data.settings.site_url.clone(),
            app_data.settings.reset_token_ttl,
        );

        // Step 2: Extract stores and assign providers
        Self {
            db: app_data.db.clone(),
            settings: app_data.settings.clone(),
            account_store: app_data.account_store.clone(),
            role_registry: app_data.role_registry.clone(),
            validator,
            manager_invariant,
            share_provider: ShareProvider::new(app_data.share_store.clone()),
            reset_tokens,
            cascade_registry: app_data.cascade_registry.clone(),
            cache: app_data.cache.clone(),
            password_store: app_data.collaborators.password_store.clone(),
            mail: app_data.collaborators.mail.clone(),
            sessions: app_data.collaborators.sessions.clone(),
            write_guard: app_data.write_guard.clone(),
        }
    }

    /// Load an account, served from the per-account cache when warm
    pub async fn get(&self, name: &str) -> Result<Account, InternalError> {
        if let Some(account) = self.cache.account(name).await {
            return Ok(account);
        }
        let account = self.account_store.get(&self.db, name).await?;
        self.cache.put_account(account.clone()).await;
        Ok(account)
    }

    pub async fn find(&self, name: &str) -> Result<Option<Account>, InternalError> {
        self.account_store.find(&self.db, name).await
    }

    /// Create a new account
    ///
    /// # Returns
    /// * `Ok(ActionOutcome)` - The stored account plus non-fatal advisories
    /// * `Err(InternalError)` - Validation failed, quota exceeded, or the name is taken
    pub async fn insert(&self, ctx: &RequestContext, account: Account) -> Result<ActionOutcome<Account>, InternalError> {
        self.persist(ctx, account, true, ValidateOptions::default()).await
    }

    /// Create a new account, first granting the roles of every matching default-role rule
    pub async fn insert_with_default_roles(
        &self,
        ctx: &RequestContext,
        account: Account,
    ) -> Result<ActionOutcome<Account>, InternalError> {
        self.persist(ctx, account, true, ValidateOptions { apply_default_roles: true })
            .await
    }

    /// Save changes to an existing account
    ///
    /// The account's `version` must match the stored row; a stale copy fails
    /// with `ConcurrentModification`.
    pub async fn save(&self, ctx: &RequestContext, account: Account) -> Result<ActionOutcome<Account>, InternalError> {
        self.persist(ctx, account, false, ValidateOptions::default()).await
    }

    /// Enable or disable an account; disabling terminates its sessions
    pub async fn set_enabled(
        &self,
        ctx: &RequestContext,
        name: &str,
        enabled: bool,
    ) -> Result<ActionOutcome<Account>, InternalError> {
        let mut account = self.account_store.get(&self.db, name).await?;
        account.enabled = enabled;
        self.save(ctx, account).await
    }

    /// Append roles that the account does not hold yet
    pub async fn add_roles(
        &self,
        ctx: &RequestContext,
        name: &str,
        roles: &[&str],
    ) -> Result<ActionOutcome<Account>, InternalError> {
        let mut account = self.account_store.get(&self.db, name).await?;
        account.append_roles(roles.iter().copied());
        self.save(ctx, account).await
    }

    /// Remove roles; refused when it would leave no System Manager
    pub async fn remove_roles(
        &self,
        ctx: &RequestContext,
        name: &str,
        roles: &[&str],
    ) -> Result<ActionOutcome<Account>, InternalError> {
        let mut account = self.account_store.get(&self.db, name).await?;
        account.remove_roles(roles.iter().copied());
        self.save(ctx, account).await
    }

    async fn persist(
        &self,
        ctx: &RequestContext,
        mut account: Account,
        is_new: bool,
        options: ValidateOptions,
    ) -> Result<ActionOutcome<Account>, InternalError> {
        let guard = self.write_guard.lock().await;
        let txn = begin_transaction(&self.db).await?;

        let previous = if is_new {
            if self.account_store.exists(&txn, &account.name).await? {
                return Err(AccountError::AlreadyExists(account.name.clone()).into());
            }
            account.owner = ctx.actor.clone();
            None
        } else {
            Some(self.account_store.get(&txn, &account.name).await?)
        };
        account.modified_by = ctx.actor.clone();

        let report = self
            .validator
            .validate(&txn, &mut account, previous.as_ref(), ctx, options)
            .await?;

        if is_new {
            self.account_store.insert(&txn, &account).await?;
        } else {
            self.account_store.update(&txn, &mut account).await?;
        }

        self.on_update(&txn, &account).await?;
        commit_transaction(txn).await?;
        drop(guard);

        tracing::info!(
            account = %account.name,
            user_type = %account.user_type,
            enabled = account.enabled,
            actor = %ctx.actor,
            "{}",
            if is_new { "Account created" } else { "Account saved" }
        );

        let advisories = self.after_commit(ctx, &mut account, report, is_new).await?;
        Ok(ActionOutcome::with_advisories(account, advisories))
    }

    /// Work that must land in the same transaction as the write
    async fn on_update(&self, conn: &impl ConnectionTrait, account: &Account) -> Result<(), InternalError> {
        self.validator.check_quota(conn, account).await?;
        self.share_provider.sync_self_share(conn, account).await
    }

    async fn after_commit(
        &self,
        ctx: &RequestContext,
        account: &mut Account,
        report: ValidationReport,
        is_new: bool,
    ) -> Result<Vec<Advisory>, InternalError> {
        let ValidationReport {
            mut advisories,
            new_password,
            disabling,
        } = report;

        self.cache.invalidate_account(&account.name).await;

        if disabling {
            match self.sessions.terminate(&account.name).await {
                Ok(()) => tracing::info!(account = %account.name, "Account disabled, sessions terminated"),
                Err(e) => {
                    tracing::warn!(account = %account.name, error = %e, "Account disabled, sessions not terminated");
                    advisories.push(Advisory::SessionsNotTerminated { message: e.to_string() });
                }
            }
        }

        // A password the store refused counts as no password at all
        let stored_password = match &new_password {
            Some(password) => match self.password_store.set(&account.name, password.expose()).await {
                Ok(()) => Some(password),
                Err(e) => {
                    tracing::warn!(account = %account.name, error = %e, "Account saved, password not stored");
                    advisories.push(Advisory::PasswordNotStored { message: e.to_string() });
                    None
                }
            },
            None => None,
        };

        let notification = if is_new {
            if stored_password.is_none() && account.send_welcome_email && !account.is_standard() {
                Some(self.send_welcome_mail(ctx, account).await.map(|_| Advisory::WelcomeEmailSent))
            } else {
                None
            }
        } else {
            match stored_password {
                Some(password) if account.send_password_update_notification => Some(
                    self.send_password_update_mail(ctx, account, password.expose())
                        .await
                        .map(|_| Advisory::PasswordEmailed),
                ),
                _ => None,
            }
        };

        match notification {
            Some(Ok(advisory)) => advisories.push(advisory),
            Some(Err(e)) => {
                tracing::warn!(account = %account.name, error = %e, "Account notification not sent");
                advisories.push(Advisory::NotificationFailed { message: e.to_string() });
            }
            None => {}
        }

        Ok(advisories)
    }

    async fn send_welcome_mail(&self, ctx: &RequestContext, account: &mut Account) -> Result<(), InternalError> {
        let link = self.reset_tokens.issue(&self.db, &account.name).await?;
        account.reset_password_key = Some(link.key.clone());
        account.reset_key_issued_at = Some(Utc::now().timestamp());

        let body = format!(
            "<p>Dear {},</p>\
             <p>A new account has been created for you at {}.</p>\
             <p>Your login id is: {}</p>\
             <p>Click on the link below to complete your registration and set a new password.</p>\
             <p><a href=\"{}\">Complete Registration</a></p>",
            greeting(account),
            self.settings.site_url,
            account.name,
            link.url,
        );
        self.send_login_mail(ctx, account, "Verify Your Account", body).await
    }

    async fn send_password_update_mail(
        &self,
        ctx: &RequestContext,
        account: &Account,
        password: &str,
    ) -> Result<(), InternalError> {
        let body = format!(
            "<p>Dear {},</p>\
             <p>Your password has been updated. Here is your new password: {}</p>",
            greeting(account),
            password,
        );
        self.send_login_mail(ctx, account, "Password Update", body).await
    }

    async fn send_login_mail(
        &self,
        ctx: &RequestContext,
        account: &Account,
        subject: &str,
        body: String,
    ) -> Result<(), InternalError> {
        let sender = (!is_standard(&ctx.actor)).then(|| ctx.actor.clone());
        let mut mail = OutboundMail::new(vec![account.email.clone()], subject, body).with_sender(sender);
        mail.reference_doctype = Some(ACCOUNT_DOCTYPE.to_string());
        mail.reference_name = Some(account.name.clone());
        self.mail.send(mail).await
    }

    /// Delete an account and purge what it owns
    ///
    /// Coordinates the sequence of operations:
    /// 1. Refuse standard accounts
    /// 2. Re-confirm another System Manager remains
    /// 3. Purge owned tasks, private events, shares and chat messages
    /// 4. Delete the account row and its roles
    /// 5. After commit: terminate sessions and drop stored credentials
    ///
    /// Failures in step 5 come back as advisories; the account is gone either way.
    pub async fn delete(&self, ctx: &RequestContext, name: &str) -> Result<ActionOutcome<()>, InternalError> {
        if is_standard(name) {
            return Err(AccountError::protected(name, "deleted").into());
        }

        let guard = self.write_guard.lock().await;
        let txn = begin_transaction(&self.db).await?;

        self.account_store.get(&txn, name).await?;
        self.manager_invariant.ensure_manager_remains(&txn, name).await?;

        let purged = self.cascade_registry.purge(&txn, name).await?;
        self.account_store.delete(&txn, name).await?;
        commit_transaction(txn).await?;
        drop(guard);

        self.cache.invalidate_account(name).await;
        tracing::info!(account = %name, purged, actor = %ctx.actor, "Account deleted");

        let mut outcome = ActionOutcome::new(());
        if let Err(e) = self.sessions.terminate(name).await {
            outcome.push(Advisory::SessionsNotTerminated { message: e.to_string() });
        }
        if let Err(e) = self.password_store.remove(name).await {
            outcome.push(Advisory::CredentialsNotUpdated { message: e.to_string() });
        }
        Ok(outcome)
    }

    /// Rename an account to a new email identity
    ///
    /// Every registered reference to the old name is rewritten in the same
    /// transaction as the account row itself. Moving credentials and ending
    /// sessions happen after commit and report failures as advisories.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        old_name: &str,
        new_name: &str,
    ) -> Result<ActionOutcome<Account>, InternalError> {
        if self.settings.is_demo_restricted(&ctx.actor) {
            return Err(AccountError::DemoRestricted.into());
        }
        if is_standard(old_name) {
            return Err(AccountError::protected(old_name, "renamed").into());
        }
        let new_name = new_name.trim();
        identity_rules::validate_email(new_name)?;

        let guard = self.write_guard.lock().await;
        let txn = begin_transaction(&self.db).await?;

        self.account_store.get(&txn, old_name).await?;
        if self.account_store.exists(&txn, new_name).await? {
            return Err(AccountError::AlreadyExists(new_name.to_string()).into());
        }

        let touched = self.cascade_registry.rename(&txn, old_name, new_name).await?;
        self.account_store.rename_key(&txn, old_name, new_name).await?;
        commit_transaction(txn).await?;
        drop(guard);

        self.cache.invalidate_account(old_name).await;
        self.cache.invalidate_account(new_name).await;
        tracing::info!(old = %old_name, new = %new_name, references = touched, actor = %ctx.actor, "Account renamed");

        let mut outcome = ActionOutcome::new(self.account_store.get(&self.db, new_name).await?);
        if let Err(e) = self.password_store.rename(old_name, new_name).await {
            outcome.push(Advisory::CredentialsNotUpdated { message: e.to_string() });
        }
        if let Err(e) = self.sessions.terminate(old_name).await {
            outcome.push(Advisory::SessionsNotTerminated { message: e.to_string() });
        }
        Ok(outcome)
    }

    /// Self-service registration of a Website User
    ///
    /// The account is created without a password; the verification link sets it.
    pub async fn sign_up(
        &self,
        email: &str,
        full_name: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, InternalError> {
        let email = email.trim();
        if let Some(existing) = self.account_store.find_by_email(&self.db, email).await? {
            return Ok(if existing.enabled {
                SignUpOutcome::AlreadyRegistered
            } else {
                SignUpOutcome::RegisteredButDisabled
            });
        }

        let since = Utc::now().timestamp() - SIGNUP_WINDOW_SECS;
        let recent = self.account_store.count_modified_since(&self.db, since).await?;
        if recent > self.settings.signup_hourly_limit {
            tracing::warn!(recent, limit = self.settings.signup_hourly_limit, "Sign-ups temporarily disabled");
            return Ok(SignUpOutcome::SignupsThrottled);
        }

        let account = Account::new(email).with_first_name(full_name.trim());
        let outcome = self
            .insert_with_default_roles(&RequestContext::guest(), account)
            .await?;

        if let Some(target) = redirect_to.map(str::trim).filter(|t| !t.is_empty()) {
            self.cache
                .set_redirect_after_login(&outcome.value.name, target)
                .await;
        }

        if outcome.has(|a| matches!(a, Advisory::WelcomeEmailSent)) {
            Ok(SignUpOutcome::VerificationSent)
        } else {
            Ok(SignUpOutcome::PendingApproval)
        }
    }

    /// Create the built-in roles and the Administrator and Guest accounts
    ///
    /// Safe to run repeatedly; existing records are left alone.
    pub async fn bootstrap_standard_accounts(&self, ctx: &RequestContext) -> Result<(), InternalError> {
        for (role, desk_access) in [
            (ADMINISTRATOR_ROLE, true),
            (GUEST_ROLE, false),
            (SYSTEM_MANAGER, true),
            (ALL_ROLE, false),
        ] {
            self.role_registry.ensure_role(&self.db, role, desk_access).await?;
        }

        for (name, roles) in [
            (ADMINISTRATOR, vec![SYSTEM_MANAGER, ADMINISTRATOR_ROLE]),
            (GUEST, vec![GUEST_ROLE]),
        ] {
            if self.account_store.exists(&self.db, name).await? {
                continue;
            }
            self.insert(ctx, Account::standard(name).with_roles(roles)).await?;
        }

        tracing::info!("Standard accounts bootstrapped");
        Ok(())
    }

    /// Register a role, or leave it untouched if it exists
    pub async fn define_role(&self, name: &str, desk_access: bool) -> Result<(), InternalError> {
        self.role_registry.ensure_role(&self.db, name, desk_access).await
    }

    /// Disable or re-enable a role globally
    ///
    /// Accounts holding a disabled role lose it on their next save.
    pub async fn set_role_disabled(&self, name: &str, disabled: bool) -> Result<bool, InternalError> {
        self.role_registry.set_disabled(&self.db, name, disabled).await
    }

    /// Enabled roles an administrator can hand out
    pub async fn list_assignable_roles(&self) -> Result<Vec<String>, InternalError> {
        self.role_registry.assignable_roles(&self.db).await
    }

    /// Enabled System Users other than the standard accounts and `exclude`
    pub async fn system_users(&self, exclude: &[String], limit: Option<u64>) -> Result<Vec<String>, InternalError> {
        self.account_store.system_user_names(&self.db, exclude, limit).await
    }

    pub async fn total_system_users(&self) -> Result<u64, InternalError> {
        self.account_store.count_enabled_system_users(&self.db, "").await
    }

    pub async fn website_user_count(&self) -> Result<u64, InternalError> {
        self.account_store.count_enabled_website_users(&self.db).await
    }

    pub fn extract_mentions(&self, text: &str) -> Vec<String> {
        identity_rules::extract_mentions(text)
    }

    /// Check a proposed share of `name`'s own record
    pub async fn validate_self_share(&self, name: &str, grantee: &str, rights: ShareRights) -> Result<(), InternalError> {
        let account = self.get(name).await?;
        ShareProvider::validate_self_share(&account, grantee, rights)
    }
}

fn greeting(account: &Account) -> &str {
    account
        .first_name
        .as_deref()
        .or(account.last_name.as_deref())
        .filter(|n| !n.is_empty())
        .unwrap_or("user")
}

#[cfg(test)]
#[path = "account_coordinator_tests.rs"]
mod tests;
