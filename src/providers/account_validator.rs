use std::sync::Arc;

use sea_orm::ConnectionTrait;

use crate::collaborators::{AvatarLookup, QuotaOracle};
use crate::config::IdentitySettings;
use crate::errors::internal::AccountError;
use crate::errors::InternalError;
use crate::providers::identity_rules;
use crate::providers::{CryptoProvider, DefaultRoles, ManagerInvariant, RoleRegistry};
use crate::stores::AccountStore;
use crate::types::internal::account::{
    ADMINISTRATOR_ROLE, GUEST, GUEST_ROLE, LANGUAGE_PLACEHOLDER, SYSTEM_MANAGER,
};
use crate::types::internal::{Account, Advisory, NewPassword, RequestContext, UserType};

const EXTERNAL_ID_LENGTH: usize = 39;

/// Per-call switches for the pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Consult the default-role rules (creation entry points only)
    pub apply_default_roles: bool,
}

/// What the pipeline decided besides the mutated account
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub advisories: Vec<Advisory>,
    /// Password taken off the record before it could be persisted
    pub new_password: Option<NewPassword>,
    /// The save turns an enabled account into a disabled one
    pub disabling: bool,
}

/// The ordered validation pipeline run before every account write
pub struct AccountValidator {
    settings: Arc<IdentitySettings>,
    account_store: Arc<AccountStore>,
    role_registry: Arc<RoleRegistry>,
    manager_invariant: Arc<ManagerInvariant>,
    default_roles: DefaultRoles,
    quota: Arc<dyn QuotaOracle>,
    avatars: Arc<dyn AvatarLookup>,
    crypto: CryptoProvider,
}

impl AccountValidator {
    pub fn new(
        settings: Arc<IdentitySettings>,
        account_store: Arc<AccountStore>,
        role_registry: Arc<RoleRegistry>,
        manager_invariant: Arc<ManagerInvariant>,
        default_roles: DefaultRoles,
        quota: Arc<dyn QuotaOracle>,
        avatars: Arc<dyn AvatarLookup>,
    ) -> Self {
        Self {
            settings,
            account_store,
            role_registry,
            manager_invariant,
            default_roles,
            quota,
            avatars,
            crypto: CryptoProvider::new(),
        }
    }

    /// Validate and normalize `account` in place
    ///
    /// `previous` is the committed state for updates and `None` for inserts.
    /// Any error aborts the save; advisories never do.
    pub async fn validate(
        &self,
        conn: &impl ConnectionTrait,
        account: &mut Account,
        previous: Option<&Account>,
        ctx: &RequestContext,
        options: ValidateOptions,
    ) -> Result<ValidationReport, InternalError> {
        let is_new = previous.is_none();
        let mut report = ValidationReport::default();

        // 1. demo tenants
        if self.settings.is_demo_restricted(&ctx.actor) {
            return Err(AccountError::DemoRestricted.into());
        }

        report.new_password = account.new_password.take();

        // 2. identity key and email shape
        if !account.is_standard() {
            identity_rules::validate_email(&account.email)?;
            identity_rules::validate_email(&account.name)?;
        }

        // 3. default roles
        if options.apply_default_roles {
            let roles = self.default_roles.resolve(&account.email).await?;
            account.append_roles(roles);
        }

        // 4. keep a System Manager around
        self.add_system_manager_role(conn, account, &mut report).await?;

        // 5. derived user type
        account.user_type = self.resolve_user_type(conn, account).await?;

        // 6.
        account.full_name =
            identity_rules::full_name(account.first_name.as_deref(), account.last_name.as_deref());

        // 7. enable/disable
        if !account.enabled && account.is_standard() {
            return Err(AccountError::protected(&account.name, "disabled").into());
        }
        report.disabling = !account.enabled && previous.is_some_and(|p| p.enabled);
        if report.disabling {
            self.manager_invariant
                .ensure_manager_remains(conn, &account.name)
                .await?;
        }

        // 8. default avatar
        if account.user_image.is_none() {
            account.user_image = self.avatars.lookup(&account.email).await?;
        }

        // 9. unique, non-empty roles; Guest keeps only Guest
        dedupe_roles(account);
        if account.name == GUEST {
            account.roles.retain(|r| r == GUEST_ROLE);
        }

        // 10.
        self.validate_username(conn, account, is_new, &mut report).await?;

        // 11. globally disabled roles cannot stay assigned
        let disabled = self.role_registry.disabled_roles(conn).await?;
        account.roles.retain(|r| !disabled.contains(r));

        // Role removal must not demote the last manager either
        if let Some(previous) = previous {
            if !report.disabling {
                self.manager_invariant
                    .ensure_not_demoting_last(conn, previous, account)
                    .await?;
            }
        }

        // 12.
        if account.language.as_deref() == Some(LANGUAGE_PLACEHOLDER) {
            account.language = None;
        }

        // 13.
        if is_new && !account.is_standard() && account.external_id.is_none() {
            account.external_id = Some(self.crypto.random_hash(EXTERNAL_ID_LENGTH));
        }

        // 14.
        self.check_quota(conn, account).await?;

        Ok(report)
    }

    /// System User iff Administrator or holding an enabled desk-access role
    pub async fn resolve_user_type(
        &self,
        conn: &impl ConnectionTrait,
        account: &Account,
    ) -> Result<UserType, InternalError> {
        if account.is_administrator() || self.role_registry.has_desk_access(conn, &account.roles).await? {
            Ok(UserType::SystemUser)
        } else {
            Ok(UserType::WebsiteUser)
        }
    }

    async fn add_system_manager_role(
        &self,
        conn: &impl ConnectionTrait,
        account: &mut Account,
        report: &mut ValidationReport,
    ) -> Result<(), InternalError> {
        if account.is_administrator() {
            account.append_roles([SYSTEM_MANAGER, ADMINISTRATOR_ROLE]);
            return Ok(());
        }

        if !account.enabled || account.is_standard() || account.holds(SYSTEM_MANAGER) {
            return Ok(());
        }

        if self.resolve_user_type(conn, account).await? != UserType::SystemUser {
            return Ok(());
        }

        let others = self
            .account_store
            .other_system_managers(conn, &account.name)
            .await?;
        if others.is_empty() {
            account.append_roles([SYSTEM_MANAGER]);
            report.advisories.push(Advisory::SystemManagerAdded);
        }
        Ok(())
    }

    async fn validate_username(
        &self,
        conn: &impl ConnectionTrait,
        account: &mut Account,
        is_new: bool,
        report: &mut ValidationReport,
    ) -> Result<(), InternalError> {
        if account.username.is_none() && is_new {
            if let Some(first_name) = account.first_name.as_deref().filter(|f| !f.trim().is_empty()) {
                account.username = Some(identity_rules::scrub(first_name));
            }
        }

        let Some(raw) = account.username.take() else {
            return Ok(());
        };
        let username = identity_rules::normalize_username(&raw);
        if username.is_empty() {
            return Ok(());
        }

        if self
            .account_store
            .username_taken(conn, &username, &account.name)
            .await?
        {
            if account.is_system_user() {
                report.advisories.push(Advisory::UsernameTaken {
                    username: username.clone(),
                });
                if let Some(suggestion) = self.suggest_username(conn, account, &username).await? {
                    report.advisories.push(Advisory::SuggestedUsername { username: suggestion });
                }
            }
            return Ok(());
        }

        if !identity_rules::is_valid_username(&username) {
            report.advisories.push(Advisory::UsernameInvalid { username });
            return Ok(());
        }

        account.username = Some(username);
        Ok(())
    }

    async fn suggest_username(
        &self,
        conn: &impl ConnectionTrait,
        account: &Account,
        taken: &str,
    ) -> Result<Option<String>, InternalError> {
        let candidates =
            identity_rules::username_suggestions(account.first_name.as_deref(), account.last_name.as_deref());
        for candidate in candidates {
            if candidate != taken
                && !self
                    .account_store
                    .username_taken(conn, &candidate, &account.name)
                    .await?
            {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Fail when saving this enabled System User would exceed the plan limit
    pub async fn check_quota(&self, conn: &impl ConnectionTrait, account: &Account) -> Result<(), InternalError> {
        if account.user_type == UserType::WebsiteUser || !account.enabled || account.is_standard() {
            return Ok(());
        }

        let Some(limit) = self.quota.max_system_users(&self.settings.tenant).await? else {
            return Ok(());
        };

        let count = self
            .account_store
            .count_enabled_system_users(conn, &account.name)
            .await?
            + 1;

        if count > limit {
            tracing::warn!(account = %account.name, count, limit, "System user limit reached");
            return Err(AccountError::MaxUsersReached { limit }.into());
        }
        Ok(())
    }
}

fn dedupe_roles(account: &mut Account) {
    let mut seen: Vec<String> = Vec::with_capacity(account.roles.len());
    for role in account.roles.drain(..) {
        let role = role.trim().to_string();
        if !role.is_empty() && !seen.contains(&role) {
            seen.push(role);
        }
    }
    account.roles = seen;
}

#[cfg(test)]
#[path = "account_validator_tests.rs"]
mod tests;
