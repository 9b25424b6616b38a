use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};

use crate::errors::internal::AccountError;
use crate::errors::InternalError;
use crate::types::db::{account, account_role};
use crate::types::internal::account::{ADMINISTRATOR, STANDARD_ACCOUNTS, SYSTEM_MANAGER};
use crate::types::internal::{Account, UserType};

/// Persistence for accounts and their role assignments
///
/// Every method takes the connection to run on so callers decide whether
/// the work joins an open transaction.
#[derive(Debug, Default, Clone)]
pub struct AccountStore;

impl AccountStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn find(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
    ) -> Result<Option<Account>, InternalError> {
        let model = account::Entity::find_by_id(name.to_string())
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_account", e))?;

        match model {
            Some(model) => {
                let roles = self.load_roles(conn, &model.name).await?;
                Ok(Some(Account::from_model(model, roles)?))
            }
            None => Ok(None),
        }
    }

    pub async fn get(&self, conn: &impl ConnectionTrait, name: &str) -> Result<Account, InternalError> {
        self.find(conn, name)
            .await?
            .ok_or_else(|| AccountError::NotFound(name.to_string()).into())
    }

    pub async fn find_by_email(
        &self,
        conn: &impl ConnectionTrait,
        email: &str,
    ) -> Result<Option<Account>, InternalError> {
        let model = account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_account_by_email", e))?;

        match model {
            Some(model) => {
                let roles = self.load_roles(conn, &model.name).await?;
                Ok(Some(Account::from_model(model, roles)?))
            }
            None => Ok(None),
        }
    }

    pub async fn find_by_reset_key(
        &self,
        conn: &impl ConnectionTrait,
        key: &str,
    ) -> Result<Option<Account>, InternalError> {
        let model = account::Entity::find()
            .filter(account::Column::ResetPasswordKey.eq(key))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_account_by_reset_key", e))?;

        match model {
            Some(model) => {
                let roles = self.load_roles(conn, &model.name).await?;
                Ok(Some(Account::from_model(model, roles)?))
            }
            None => Ok(None),
        }
    }

    pub async fn exists(&self, conn: &impl ConnectionTrait, name: &str) -> Result<bool, InternalError> {
        let count = account::Entity::find()
            .filter(account::Column::Name.eq(name))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("account_exists", e))?;
        Ok(count > 0)
    }

    /// Assigned roles in assignment order
    pub async fn load_roles(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
    ) -> Result<Vec<String>, InternalError> {
        let rows = account_role::Entity::find()
            .filter(account_role::Column::Account.eq(name))
            .order_by_asc(account_role::Column::Idx)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("load_account_roles", e))?;

        Ok(rows.into_iter().map(|r| r.role).collect())
    }

    pub async fn replace_roles(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        roles: &[String],
    ) -> Result<(), InternalError> {
        account_role::Entity::delete_many()
            .filter(account_role::Column::Account.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("clear_account_roles", e))?;

        if roles.is_empty() {
            return Ok(());
        }

        let rows = roles.iter().enumerate().map(|(idx, role)| account_role::ActiveModel {
            account: Set(name.to_string()),
            role: Set(role.clone()),
            idx: Set(idx as i32),
            ..Default::default()
        });

        account_role::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("insert_account_roles", e))?;

        Ok(())
    }

    /// Insert a new account row together with its roles
    pub async fn insert(&self, conn: &impl ConnectionTrait, account: &Account) -> Result<(), InternalError> {
        account::Entity::insert(account.to_active_model())
            .exec_without_returning(conn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    InternalError::from(AccountError::AlreadyExists(account.name.clone()))
                }
                _ => InternalError::database("insert_account", e),
            })?;

        self.replace_roles(conn, &account.name, &account.roles).await
    }

    /// Write every column of an existing account and bump its version
    ///
    /// The update only applies while the stored version still equals
    /// `account.version`; otherwise another writer got there first.
    pub async fn update(&self, conn: &impl ConnectionTrait, account: &mut Account) -> Result<(), InternalError> {
        let expected = account.version;
        account.version = expected + 1;
        account.updated_at = Utc::now().timestamp();

        // Reset token columns belong to set_reset_key / clear_reset_state
        let mut model = account.to_active_model();
        model.reset_password_key = NotSet;
        model.reset_key_issued_at = NotSet;

        let result = account::Entity::update_many()
            .set(model)
            .filter(account::Column::Name.eq(account.name.as_str()))
            .filter(account::Column::Version.eq(expected))
            .exec(conn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => InternalError::from(AccountError::validation(
                    "username",
                    "username is already taken",
                )),
                _ => InternalError::database("update_account", e),
            })?;

        if result.rows_affected == 0 {
            account.version = expected;
            return Err(AccountError::ConcurrentModification(account.name.clone()).into());
        }

        self.replace_roles(conn, &account.name, &account.roles).await
    }

    pub async fn set_reset_key(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        key: &str,
        issued_at: i64,
    ) -> Result<(), InternalError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::ResetPasswordKey, Expr::value(key))
            .col_expr(account::Column::ResetKeyIssuedAt, Expr::value(issued_at))
            .filter(account::Column::Name.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("set_reset_key", e))?;

        if result.rows_affected == 0 {
            return Err(AccountError::NotFound(name.to_string()).into());
        }
        Ok(())
    }

    /// Clear the reset token and the pending post-login redirect
    pub async fn clear_reset_state(&self, conn: &impl ConnectionTrait, name: &str) -> Result<(), InternalError> {
        account::Entity::update_many()
            .col_expr(account::Column::ResetPasswordKey, Expr::value(Option::<String>::None))
            .col_expr(account::Column::ResetKeyIssuedAt, Expr::value(Option::<i64>::None))
            .col_expr(account::Column::RedirectUrl, Expr::value(Option::<String>::None))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(account::Column::Name.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("clear_reset_state", e))?;
        Ok(())
    }

    /// Clear the reset state only while `key` is still the account's token
    ///
    /// Returns false when the token was already used or superseded.
    pub async fn consume_reset_key(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        key: &str,
    ) -> Result<bool, InternalError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::ResetPasswordKey, Expr::value(Option::<String>::None))
            .col_expr(account::Column::ResetKeyIssuedAt, Expr::value(Option::<i64>::None))
            .col_expr(account::Column::RedirectUrl, Expr::value(Option::<String>::None))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(account::Column::Name.eq(name))
            .filter(account::Column::ResetPasswordKey.eq(key))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("consume_reset_key", e))?;

        Ok(result.rows_affected == 1)
    }

    pub async fn delete(&self, conn: &impl ConnectionTrait, name: &str) -> Result<(), InternalError> {
        account_role::Entity::delete_many()
            .filter(account_role::Column::Account.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_account_roles", e))?;

        account::Entity::delete_by_id(name.to_string())
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_account", e))?;
        Ok(())
    }

    /// Re-key the account row; the new name doubles as its email
    pub async fn rename_key(
        &self,
        conn: &impl ConnectionTrait,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), InternalError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::Name, Expr::value(new_name))
            .col_expr(account::Column::Email, Expr::value(new_name))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .col_expr(account::Column::Version, Expr::col(account::Column::Version).add(1))
            .filter(account::Column::Name.eq(old_name))
            .exec(conn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    InternalError::from(AccountError::AlreadyExists(new_name.to_string()))
                }
                _ => InternalError::database("rename_account", e),
            })?;

        if result.rows_affected == 0 {
            return Err(AccountError::NotFound(old_name.to_string()).into());
        }
        Ok(())
    }

    /// Whether another account already uses this username
    pub async fn username_taken(
        &self,
        conn: &impl ConnectionTrait,
        username: &str,
        exclude: &str,
    ) -> Result<bool, InternalError> {
        let count = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .filter(account::Column::Name.ne(exclude))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("username_taken", e))?;
        Ok(count > 0)
    }

    /// Enabled System Users other than the standard accounts and `exclude`
    pub async fn count_enabled_system_users(
        &self,
        conn: &impl ConnectionTrait,
        exclude: &str,
    ) -> Result<u64, InternalError> {
        account::Entity::find()
            .filter(account::Column::Enabled.eq(true))
            .filter(account::Column::UserType.eq(UserType::SystemUser.as_str()))
            .filter(account::Column::Name.is_not_in(STANDARD_ACCOUNTS))
            .filter(account::Column::Name.ne(exclude))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("count_enabled_system_users", e))
    }

    /// Enabled System Users holding System Manager, other than Administrator and `exclude`
    pub async fn other_system_managers(
        &self,
        conn: &impl ConnectionTrait,
        exclude: &str,
    ) -> Result<Vec<String>, InternalError> {
        let holders: Vec<String> = account_role::Entity::find()
            .select_only()
            .column(account_role::Column::Account)
            .filter(account_role::Column::Role.eq(SYSTEM_MANAGER))
            .filter(account_role::Column::Account.is_not_in([ADMINISTRATOR, exclude]))
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("find_system_manager_holders", e))?;

        if holders.is_empty() {
            return Ok(Vec::new());
        }

        account::Entity::find()
            .select_only()
            .column(account::Column::Name)
            .filter(account::Column::Name.is_in(holders))
            .filter(account::Column::Enabled.eq(true))
            .filter(account::Column::UserType.eq(UserType::SystemUser.as_str()))
            .order_by_asc(account::Column::Name)
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("other_system_managers", e))
    }

    /// Names of enabled non-Website accounts, minus the standard accounts and `exclude`
    pub async fn system_user_names(
        &self,
        conn: &impl ConnectionTrait,
        exclude: &[String],
        limit: Option<u64>,
    ) -> Result<Vec<String>, InternalError> {
        let mut query = account::Entity::find()
            .select_only()
            .column(account::Column::Name)
            .filter(account::Column::Enabled.eq(true))
            .filter(account::Column::UserType.ne(UserType::WebsiteUser.as_str()))
            .filter(account::Column::Name.is_not_in(STANDARD_ACCOUNTS))
            .order_by_asc(account::Column::Name);

        if !exclude.is_empty() {
            query = query.filter(account::Column::Name.is_not_in(exclude.iter().cloned()));
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("system_user_names", e))
    }

    pub async fn count_enabled_website_users(&self, conn: &impl ConnectionTrait) -> Result<u64, InternalError> {
        account::Entity::find()
            .filter(account::Column::Enabled.eq(true))
            .filter(account::Column::UserType.eq(UserType::WebsiteUser.as_str()))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("count_enabled_website_users", e))
    }

    /// Accounts written at or after `since` (unix seconds)
    pub async fn count_modified_since(&self, conn: &impl ConnectionTrait, since: i64) -> Result<u64, InternalError> {
        account::Entity::find()
            .filter(account::Column::UpdatedAt.gte(since))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("count_modified_since", e))
    }
}

#[cfg(test)]
#[path = "account_store_tests.rs"]
mod tests;
