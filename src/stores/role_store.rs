use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::errors::InternalError;
use crate::types::db::role;

#[derive(Debug, Default, Clone)]
pub struct RoleStore;

impl RoleStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn all(&self, conn: &impl ConnectionTrait) -> Result<Vec<role::Model>, InternalError> {
        role::Entity::find()
            .order_by_asc(role::Column::Name)
            .all(conn)
            .await
            .map_err(|e| InternalError::database("list_roles", e))
    }

    pub async fn find(&self, conn: &impl ConnectionTrait, name: &str) -> Result<Option<role::Model>, InternalError> {
        role::Entity::find_by_id(name.to_string())
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_role", e))
    }

    /// Create the role if it does not exist; an existing role keeps its flags
    pub async fn ensure(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        desk_access: bool,
    ) -> Result<(), InternalError> {
        let now = Utc::now().timestamp();
        let model = role::ActiveModel {
            name: Set(name.to_string()),
            desk_access: Set(desk_access),
            disabled: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("ensure_role", e))?;
        Ok(())
    }

    /// Returns false when the role does not exist
    pub async fn set_disabled(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        disabled: bool,
    ) -> Result<bool, InternalError> {
        let result = role::Entity::update_many()
            .col_expr(role::Column::Disabled, Expr::value(disabled))
            .col_expr(role::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(role::Column::Name.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("set_role_disabled", e))?;
        Ok(result.rows_affected > 0)
    }

    pub async fn set_desk_access(
        &self,
        conn: &impl ConnectionTrait,
        name: &str,
        desk_access: bool,
    ) -> Result<bool, InternalError> {
        let result = role::Entity::update_many()
            .col_expr(role::Column::DeskAccess, Expr::value(desk_access))
            .col_expr(role::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(role::Column::Name.eq(name))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("set_role_desk_access", e))?;
        Ok(result.rows_affected > 0)
    }
}
