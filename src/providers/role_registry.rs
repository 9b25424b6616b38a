use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::ConnectionTrait;

use crate::errors::InternalError;
use crate::providers::cache_provider::{CacheKey, CacheProvider, RoleFlags};
use crate::stores::RoleStore;
use crate::types::internal::account::{ADMINISTRATOR_ROLE, ALL_ROLE, GUEST_ROLE};

/// Role lookups served from the process cache
pub struct RoleRegistry {
    role_store: Arc<RoleStore>,
    cache: Arc<CacheProvider>,
}

impl RoleRegistry {
    pub fn new(role_store: Arc<RoleStore>, cache: Arc<CacheProvider>) -> Self {
        Self { role_store, cache }
    }

    async fn flags(&self, conn: &impl ConnectionTrait) -> Result<HashMap<String, RoleFlags>, InternalError> {
        if let Some(roles) = self.cache.roles().await {
            return Ok(roles);
        }

        let roles: HashMap<String, RoleFlags> = self
            .role_store
            .all(conn)
            .await?
            .into_iter()
            .map(|r| {
                (
                    r.name,
                    RoleFlags {
                        desk_access: r.desk_access,
                        disabled: r.disabled,
                    },
                )
            })
            .collect();

        self.cache.put_roles(roles.clone()).await;
        Ok(roles)
    }

    /// Unknown roles count as enabled
    pub async fn is_enabled(&self, conn: &impl ConnectionTrait, role: &str) -> Result<bool, InternalError> {
        Ok(self.flags(conn).await?.get(role).is_none_or(|f| !f.disabled))
    }

    /// True if any enabled role in the set grants desk access
    pub async fn has_desk_access(&self, conn: &impl ConnectionTrait, roles: &[String]) -> Result<bool, InternalError> {
        let flags = self.flags(conn).await?;
        Ok(roles
            .iter()
            .filter_map(|r| flags.get(r))
            .any(|f| f.desk_access && !f.disabled))
    }

    pub async fn disabled_roles(&self, conn: &impl ConnectionTrait) -> Result<Vec<String>, InternalError> {
        let mut disabled: Vec<String> = self
            .flags(conn)
            .await?
            .into_iter()
            .filter(|(_, f)| f.disabled)
            .map(|(name, _)| name)
            .collect();
        disabled.sort();
        Ok(disabled)
    }

    /// Enabled roles an administrator may hand out
    pub async fn assignable_roles(&self, conn: &impl ConnectionTrait) -> Result<Vec<String>, InternalError> {
        let mut roles: Vec<String> = self
            .flags(conn)
            .await?
            .into_iter()
            .filter(|(name, f)| !f.disabled && ![ADMINISTRATOR_ROLE, GUEST_ROLE, ALL_ROLE].contains(&name.as_str()))
            .map(|(name, _)| name)
            .collect();
        roles.sort();
        Ok(roles)
    }

    pub async fn ensure_role(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        desk_access: bool,
    ) -> Result<(), InternalError> {
        self.role_store.ensure(conn, name, desk_access).await?;
        self.cache.invalidate(&CacheKey::Roles).await;
        Ok(())
    }

    pub async fn set_disabled(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        disabled: bool,
    ) -> Result<bool, InternalError> {
        let changed = self.role_store.set_disabled(conn, name, disabled).await?;
        self.cache.invalidate(&CacheKey::Roles).await;
        tracing::info!(role = %name, disabled, "Role flag updated");
        Ok(changed)
    }

    pub async fn set_desk_access(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        desk_access: bool,
    ) -> Result<bool, InternalError> {
        let changed = self.role_store.set_desk_access(conn, name, desk_access).await?;
        self.cache.invalidate(&CacheKey::Roles).await;
        Ok(changed)
    }
}
