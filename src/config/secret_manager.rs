use std::fmt;

use crate::config::{EnvironmentProvider, SecretConfig, SecretType};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Required secret '{secret_name}' is missing")]
    Missing { secret_name: String },

    #[error("Secret '{secret_name}' must be at least {expected} characters, got {actual}")]
    InvalidLength {
        secret_name: String,
        expected: usize,
        actual: usize,
    },
}

impl SecretError {
    pub fn missing(secret_name: &str) -> Self {
        Self::Missing {
            secret_name: secret_name.to_string(),
        }
    }

    pub fn invalid_length(secret_name: &str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            secret_name: secret_name.to_string(),
            expected,
            actual,
        }
    }
}

/// Centralized holder for process secrets
///
/// `pepper` keys the argon2 password hasher; `link_secret` signs
/// subscription and unsubscribe links.
pub struct SecretManager {
    pepper: String,
    link_secret: String,
}

impl SecretManager {
    /// Load and validate all secrets from the given environment
    pub fn init(env: &dyn EnvironmentProvider) -> Result<Self, SecretError> {
        let pepper = Self::load_secret(env, &Self::pepper_config())?;
        let link_secret = Self::load_secret(env, &Self::link_secret_config())?;

        Ok(Self { pepper, link_secret })
    }

    /// Build a manager from known values (tests and embedding)
    pub fn from_values(pepper: impl Into<String>, link_secret: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
            link_secret: link_secret.into(),
        }
    }

    fn pepper_config() -> SecretConfig {
        SecretConfig::env_var("PASSWORD_PEPPER").required(true).min_length(16)
    }

    fn link_secret_config() -> SecretConfig {
        SecretConfig::env_var("LINK_SIGNING_SECRET").required(true).min_length(32)
    }

    pub fn pepper(&self) -> &str {
        &self.pepper
    }

    pub fn link_secret(&self) -> &str {
        &self.link_secret
    }

    pub(crate) fn load_secret(
        env: &dyn EnvironmentProvider,
        config: &SecretConfig,
    ) -> Result<String, SecretError> {
        let value = match &config.secret_type {
            SecretType::EnvVar { name } => match env.get_var(name) {
                Some(v) => v,
                None if !config.required => return Ok(String::new()),
                None => return Err(SecretError::missing(name)),
            },
        };

        if let Some(min_len) = config.min_length {
            if value.len() < min_len {
                return Err(SecretError::invalid_length(
                    config.secret_type.name(),
                    min_len,
                    value.len(),
                ));
            }
        }

        Ok(value)
    }
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("pepper", &"<redacted>")
            .field("link_secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretManager {{ secrets_loaded: 2 }}")
    }
}
