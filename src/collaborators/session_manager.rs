use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collaborators::SessionManager;
use crate::errors::InternalError;

/// Tracks live sessions per account in process memory
#[derive(Debug, Default)]
pub struct InMemorySessionManager {
    sessions: RwLock<HashMap<String, u32>>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_active(&self, account: &str) -> bool {
        self.sessions.read().await.get(account).is_some_and(|count| *count > 0)
    }

    pub async fn active_sessions(&self, account: &str) -> u32 {
        self.sessions.read().await.get(account).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn terminate(&self, account: &str) -> Result<(), InternalError> {
        if self.sessions.write().await.remove(account).is_some() {
            tracing::info!(account = %account, "Terminated sessions");
        }
        Ok(())
    }

    async fn establish(&self, account: &str) -> Result<(), InternalError> {
        *self.sessions.write().await.entry(account.to_string()).or_insert(0) += 1;
        tracing::debug!(account = %account, "Session established");
        Ok(())
    }
}
