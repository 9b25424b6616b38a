use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::internal::Account;

/// Flags of a role as seen by account validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleFlags {
    pub desk_access: bool,
    pub disabled: bool,
}

/// Addressable cache entries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The whole role table
    Roles,
    Account(String),
    RedirectAfterLogin(String),
}

/// Process-wide cache with explicit invalidation
#[derive(Debug, Default)]
pub struct CacheProvider {
    roles: RwLock<Option<HashMap<String, RoleFlags>>>,
    accounts: RwLock<HashMap<String, Account>>,
    redirects: RwLock<HashMap<String, String>>,
}

impl CacheProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        match key {
            CacheKey::Roles => {
                self.roles.write().await.take();
            }
            CacheKey::Account(name) => {
                self.accounts.write().await.remove(name);
            }
            CacheKey::RedirectAfterLogin(name) => {
                self.redirects.write().await.remove(name);
            }
        }
        tracing::debug!(key = ?key, "Cache invalidated");
    }

    /// Drop everything cached for one account
    pub async fn invalidate_account(&self, name: &str) {
        self.invalidate(&CacheKey::Account(name.to_string())).await;
    }

    pub async fn roles(&self) -> Option<HashMap<String, RoleFlags>> {
        self.roles.read().await.clone()
    }

    pub async fn put_roles(&self, roles: HashMap<String, RoleFlags>) {
        *self.roles.write().await = Some(roles);
    }

    pub async fn account(&self, name: &str) -> Option<Account> {
        self.accounts.read().await.get(name).cloned()
    }

    pub async fn put_account(&self, account: Account) {
        self.accounts.write().await.insert(account.name.clone(), account);
    }

    pub async fn set_redirect_after_login(&self, name: &str, target: &str) {
        self.redirects.write().await.insert(name.to_string(), target.to_string());
    }

    /// One-time read: the redirect is removed as it is returned
    pub async fn take_redirect_after_login(&self, name: &str) -> Option<String> {
        self.redirects.write().await.remove(name)
    }
}
