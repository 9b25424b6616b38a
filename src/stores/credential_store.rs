use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::collaborators::PasswordStore;
use crate::errors::InternalError;
use crate::types::db::credential;

/// Argon2id password hashes keyed by account, peppered with a process secret
pub struct CredentialStore {
    db: DatabaseConnection,
    password_pepper: String,
}

impl CredentialStore {
    pub fn new(db: DatabaseConnection, password_pepper: String) -> Self {
        Self { db, password_pepper }
    }

    fn hasher(&self) -> Result<Argon2<'_>, InternalError> {
        Argon2::new_with_secret(
            self.password_pepper.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| InternalError::crypto("argon2_init", e.to_string()))
    }
}

#[async_trait]
impl PasswordStore for CredentialStore {
    async fn set(&self, account: &str, plaintext: &str) -> Result<(), InternalError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let password_hash = self
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| InternalError::crypto("password_hash", e.to_string()))?
            .to_string();

        let model = credential::ActiveModel {
            account: Set(account.to_string()),
            password_hash: Set(password_hash),
            updated_at: Set(Utc::now().timestamp()),
        };

        credential::Entity::insert(model)
            .on_conflict(
                OnConflict::column(credential::Column::Account)
                    .update_columns([credential::Column::PasswordHash, credential::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| InternalError::database("set_password", e))?;

        tracing::debug!(account = %account, "Password updated");
        Ok(())
    }

    async fn verify(&self, account: &str, plaintext: &str) -> Result<bool, InternalError> {
        let stored = credential::Entity::find_by_id(account.to_string())
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_credential", e))?;

        let Some(stored) = stored else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(&stored.password_hash)
            .map_err(|e| InternalError::crypto("parse_password_hash", e.to_string()))?;

        Ok(self
            .hasher()?
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }

    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), InternalError> {
        credential::Entity::update_many()
            .col_expr(credential::Column::Account, Expr::value(new_name))
            .filter(credential::Column::Account.eq(old_name))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("rename_credential", e))?;
        Ok(())
    }

    async fn remove(&self, account: &str) -> Result<(), InternalError> {
        credential::Entity::delete_many()
            .filter(credential::Column::Account.eq(account))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("remove_credential", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::setup_test_db;

    async fn store() -> CredentialStore {
        CredentialStore::new(setup_test_db().await, "test-pepper-for-unit-tests".to_string())
    }

    #[tokio::test]
    async fn test_set_then_verify() {
        let store = store().await;

        store.set("a@x.com", "correct horse").await.unwrap();

        assert!(store.verify("a@x.com", "correct horse").await.unwrap());
        assert!(!store.verify("a@x.com", "wrong horse").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_replaces_previous_password() {
        let store = store().await;

        store.set("a@x.com", "first").await.unwrap();
        store.set("a@x.com", "second").await.unwrap();

        assert!(!store.verify("a@x.com", "first").await.unwrap());
        assert!(store.verify("a@x.com", "second").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unknown_account_is_false() {
        let store = store().await;
        assert!(!store.verify("nobody@x.com", "anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_depends_on_pepper() {
        let db = setup_test_db().await;
        let store = CredentialStore::new(db.clone(), "pepper-number-one-16".to_string());
        store.set("a@x.com", "secret").await.unwrap();

        let other = CredentialStore::new(db, "pepper-number-two-16".to_string());
        assert!(!other.verify("a@x.com", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_and_remove() {
        let store = store().await;
        store.set("old@x.com", "secret").await.unwrap();

        store.rename("old@x.com", "new@x.com").await.unwrap();
        assert!(store.verify("new@x.com", "secret").await.unwrap());
        assert!(!store.verify("old@x.com", "secret").await.unwrap());

        store.remove("new@x.com").await.unwrap();
        assert!(!store.verify("new@x.com", "secret").await.unwrap());
    }
}
