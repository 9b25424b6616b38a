use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::errors::InternalError;
use crate::types::db::{email_group, email_group_member};

/// Email groups and their subscription records
#[derive(Debug, Default, Clone)]
pub struct EmailGroupStore;

impl EmailGroupStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn group_exists(&self, conn: &impl ConnectionTrait, title: &str) -> Result<bool, InternalError> {
        let count = email_group::Entity::find()
            .filter(email_group::Column::Title.eq(title))
            .count(conn)
            .await
            .map_err(|e| InternalError::database("email_group_exists", e))?;
        Ok(count > 0)
    }

    /// Create the group unless it exists; returns whether it was created
    pub async fn ensure_group(
        &self,
        conn: &impl ConnectionTrait,
        title: &str,
        owner: &str,
    ) -> Result<bool, InternalError> {
        let model = email_group::ActiveModel {
            title: Set(title.to_string()),
            owner: Set(owner.to_string()),
            created_at: Set(Utc::now().timestamp()),
        };

        let inserted = email_group::Entity::insert(model)
            .on_conflict(OnConflict::column(email_group::Column::Title).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("ensure_email_group", e))?;
        Ok(inserted > 0)
    }

    pub async fn find_member(
        &self,
        conn: &impl ConnectionTrait,
        group: &str,
        email: &str,
    ) -> Result<Option<email_group_member::Model>, InternalError> {
        email_group_member::Entity::find()
            .filter(email_group_member::Column::EmailGroup.eq(group))
            .filter(email_group_member::Column::Email.eq(email))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_email_group_member", e))
    }

    pub async fn insert_member(
        &self,
        conn: &impl ConnectionTrait,
        group: &str,
        email: &str,
    ) -> Result<(), InternalError> {
        let now = Utc::now().timestamp();
        let model = email_group_member::ActiveModel {
            email_group: Set(group.to_string()),
            email: Set(email.to_string()),
            unsubscribed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        email_group_member::Entity::insert(model)
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("insert_email_group_member", e))?;
        Ok(())
    }

    /// Set the unsubscribed flag; returns the number of memberships touched
    pub async fn set_unsubscribed(
        &self,
        conn: &impl ConnectionTrait,
        group: &str,
        email: &str,
        unsubscribed: bool,
    ) -> Result<u64, InternalError> {
        let result = email_group_member::Entity::update_many()
            .col_expr(email_group_member::Column::Unsubscribed, Expr::value(unsubscribed))
            .col_expr(email_group_member::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(email_group_member::Column::EmailGroup.eq(group))
            .filter(email_group_member::Column::Email.eq(email))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("set_member_unsubscribed", e))?;
        Ok(result.rows_affected)
    }

    /// Emails of members that have not unsubscribed, in join order
    pub async fn subscribed_emails(
        &self,
        conn: &impl ConnectionTrait,
        group: &str,
    ) -> Result<Vec<String>, InternalError> {
        email_group_member::Entity::find()
            .select_only()
            .column(email_group_member::Column::Email)
            .filter(email_group_member::Column::EmailGroup.eq(group))
            .filter(email_group_member::Column::Unsubscribed.eq(false))
            .order_by_asc(email_group_member::Column::Id)
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("subscribed_emails", e))
    }
}
