use async_trait::async_trait;

use crate::collaborators::QuotaOracle;
use crate::config::IdentitySettings;
use crate::errors::InternalError;

/// Fixed limits, the same for every tenant
#[derive(Debug, Default, Clone)]
pub struct StaticQuotaOracle {
    max_system_users: Option<u64>,
    max_email_recipients: Option<u64>,
}

impl StaticQuotaOracle {
    pub fn new(max_system_users: Option<u64>, max_email_recipients: Option<u64>) -> Self {
        Self {
            max_system_users,
            max_email_recipients,
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &IdentitySettings) -> Self {
        Self::new(settings.max_system_users, settings.max_email_recipients)
    }
}

#[async_trait]
impl QuotaOracle for StaticQuotaOracle {
    async fn max_system_users(&self, _tenant: &str) -> Result<Option<u64>, InternalError> {
        Ok(self.max_system_users)
    }

    async fn max_email_recipients(&self, _tenant: &str) -> Result<Option<u64>, InternalError> {
        Ok(self.max_email_recipients)
    }
}
