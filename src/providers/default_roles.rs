use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::InternalError;

/// A typed rule granting a role to new accounts whose email it matches
#[async_trait]
pub trait DefaultRoleRule: Send + Sync {
    fn role(&self) -> &str;

    async fn matches(&self, email: &str) -> Result<bool, InternalError>;
}

/// Matches every address at one domain
#[derive(Debug, Clone)]
pub struct EmailDomainRule {
    domain: String,
    role: String,
}

impl EmailDomainRule {
    pub fn new(domain: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            domain: domain.into().trim_start_matches('@').to_lowercase(),
            role: role.into(),
        }
    }
}

#[async_trait]
impl DefaultRoleRule for EmailDomainRule {
    fn role(&self) -> &str {
        &self.role
    }

    async fn matches(&self, email: &str) -> Result<bool, InternalError> {
        Ok(email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(&self.domain)))
    }
}

/// Matches a fixed list of addresses
#[derive(Debug, Clone)]
pub struct EmailListRule {
    emails: Vec<String>,
    role: String,
}

impl EmailListRule {
    pub fn new<I, S>(emails: I, role: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(|e| e.into().to_lowercase()).collect(),
            role: role.into(),
        }
    }
}

#[async_trait]
impl DefaultRoleRule for EmailListRule {
    fn role(&self) -> &str {
        &self.role
    }

    async fn matches(&self, email: &str) -> Result<bool, InternalError> {
        Ok(self.emails.contains(&email.to_lowercase()))
    }
}

/// Ordered rule list plus the fallback portal role
#[derive(Clone, Default)]
pub struct DefaultRoles {
    rules: Vec<Arc<dyn DefaultRoleRule>>,
    fallback: Option<String>,
}

impl DefaultRoles {
    pub fn new(rules: Vec<Arc<dyn DefaultRoleRule>>, fallback: Option<String>) -> Self {
        Self { rules, fallback }
    }

    /// Roles of every matching rule, or the fallback when none match
    pub async fn resolve(&self, email: &str) -> Result<Vec<String>, InternalError> {
        let mut roles = Vec::new();
        for rule in &self.rules {
            if rule.matches(email).await? && !roles.iter().any(|r| r == rule.role()) {
                roles.push(rule.role().to_string());
            }
        }

        if roles.is_empty() {
            if let Some(fallback) = &self.fallback {
                roles.push(fallback.clone());
            }
        }
        Ok(roles)
    }
}
