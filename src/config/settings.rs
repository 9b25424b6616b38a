use std::fmt;
use std::time::Duration;

use crate::config::{EnvironmentProvider, SystemEnvironment};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid setting '{setting_name}': {reason}")]
    InvalidSetting { setting_name: String, reason: String },
}

impl ConfigError {
    fn invalid(setting_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting_name: setting_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Tenant-level settings for the identity and dispatch engines
#[derive(Clone)]
pub struct IdentitySettings {
    pub database_url: String,
    pub site_url: String,
    pub tenant: String,
    /// When set the tenant is demo-restricted and this account may not save accounts
    pub demo_account: Option<String>,
    /// Role granted to newly created Website Users when no rule matches
    pub default_portal_role: Option<String>,
    pub system_user_home: String,
    pub reset_token_ttl: Duration,
    pub subscription_link_ttl: Duration,
    pub subscription_group: String,
    pub newsletter_queue: String,
    pub newsletter_job_timeout: Duration,
    pub worker_concurrency: usize,
    pub signup_hourly_limit: u64,
    pub max_system_users: Option<u64>,
    pub max_email_recipients: Option<u64>,
}

impl IdentitySettings {
    pub fn from_env_provider(env: &dyn EnvironmentProvider) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| env.get_var(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| env.get_var(key).filter(|v| !v.trim().is_empty());

        let database_url = text("DATABASE_URL", "sqlite://identity.db?mode=rwc");
        if database_url.is_empty() {
            return Err(ConfigError::invalid("DATABASE_URL", "must not be empty"));
        }

        Ok(Self {
            database_url,
            site_url: text("SITE_URL", "http://localhost:8000").trim_end_matches('/').to_string(),
            tenant: text("TENANT", "default"),
            demo_account: optional("DEMO_ACCOUNT"),
            default_portal_role: optional("DEFAULT_PORTAL_ROLE"),
            system_user_home: text("SYSTEM_USER_HOME", "/desk"),
            reset_token_ttl: Duration::from_secs(parse_number(env, "RESET_TOKEN_TTL_HOURS", 24)? * 3600),
            subscription_link_ttl: Duration::from_secs(
                parse_number(env, "SUBSCRIPTION_LINK_TTL_HOURS", 48)? * 3600,
            ),
            subscription_group: text("SUBSCRIPTION_GROUP", "Website"),
            newsletter_queue: text("NEWSLETTER_QUEUE", "default"),
            newsletter_job_timeout: Duration::from_secs(parse_number(env, "NEWSLETTER_JOB_TIMEOUT_SECS", 3000)?),
            worker_concurrency: parse_positive(env, "WORKER_CONCURRENCY", 2)? as usize,
            signup_hourly_limit: parse_number(env, "SIGNUP_HOURLY_LIMIT", 300)?,
            max_system_users: parse_optional(env, "MAX_SYSTEM_USERS")?,
            max_email_recipients: parse_optional(env, "MAX_EMAIL_RECIPIENTS")?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_provider(&SystemEnvironment)
    }

    /// Settings for tests: in-memory database, no quotas
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            site_url: "http://localhost:8000".to_string(),
            tenant: "test".to_string(),
            demo_account: None,
            default_portal_role: None,
            system_user_home: "/desk".to_string(),
            reset_token_ttl: Duration::from_secs(24 * 3600),
            subscription_link_ttl: Duration::from_secs(48 * 3600),
            subscription_group: "Website".to_string(),
            newsletter_queue: "default".to_string(),
            newsletter_job_timeout: Duration::from_secs(3000),
            worker_concurrency: 2,
            signup_hourly_limit: 300,
            max_system_users: None,
            max_email_recipients: None,
        }
    }

    pub fn is_demo_restricted(&self, actor: &str) -> bool {
        self.demo_account.as_deref() == Some(actor)
    }
}

fn parse_number(env: &dyn EnvironmentProvider, key: &str, default: u64) -> Result<u64, ConfigError> {
    match env.get_var(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::invalid(key, format!("{:?} is not a number: {}", value, e))),
    }
}

fn parse_positive(env: &dyn EnvironmentProvider, key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = parse_number(env, key, default)?;
    if value == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn parse_optional(env: &dyn EnvironmentProvider, key: &str) -> Result<Option<u64>, ConfigError> {
    match env.get_var(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(_) => parse_number(env, key, 0).map(Some),
    }
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("database_url", &self.database_url)
            .field("site_url", &self.site_url)
            .field("tenant", &self.tenant)
            .field("demo_restricted", &self.demo_account.is_some())
            .field("newsletter_queue", &self.newsletter_queue)
            .field("worker_concurrency", &self.worker_concurrency)
            .field("max_system_users", &self.max_system_users)
            .field("max_email_recipients", &self.max_email_recipients)
            .finish()
    }
}
