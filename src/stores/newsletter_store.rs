use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr};

use crate::errors::internal::DispatchError;
use crate::errors::InternalError;
use crate::types::db::newsletter;
use crate::types::internal::{DispatchState, Newsletter};

#[derive(Debug, Default, Clone)]
pub struct NewsletterStore;

impl NewsletterStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert(
        &self,
        conn: &impl ConnectionTrait,
        subject: &str,
        email_group: &str,
        message: &str,
        send_from: Option<&str>,
        owner: &str,
    ) -> Result<Newsletter, InternalError> {
        let now = Utc::now().timestamp();
        let model = newsletter::ActiveModel {
            subject: Set(subject.to_string()),
            email_group: Set(email_group.to_string()),
            message: Set(message.to_string()),
            send_from: Set(send_from.map(str::to_string)),
            status: Set(DispatchState::Draft.as_str().to_string()),
            owner: Set(owner.to_string()),
            modified_by: Set(owner.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        newsletter::Entity::insert(model)
            .exec_without_returning(conn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    InternalError::from(DispatchError::AlreadyExists(subject.to_string()))
                }
                _ => InternalError::database("insert_newsletter", e),
            })?;

        Ok(Newsletter {
            subject: subject.to_string(),
            email_group: email_group.to_string(),
            message: message.to_string(),
            send_from: send_from.map(str::to_string),
            state: DispatchState::Draft,
            owner: owner.to_string(),
        })
    }

    pub async fn find(&self, conn: &impl ConnectionTrait, subject: &str) -> Result<Option<Newsletter>, InternalError> {
        let model = newsletter::Entity::find_by_id(subject.to_string())
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_newsletter", e))?;

        model.map(Newsletter::from_model).transpose()
    }

    pub async fn get(&self, conn: &impl ConnectionTrait, subject: &str) -> Result<Newsletter, InternalError> {
        self.find(conn, subject)
            .await?
            .ok_or_else(|| DispatchError::not_found("Newsletter", subject).into())
    }

    /// Subjects of every newsletter currently in `state`, oldest first
    pub async fn subjects_in_state(
        &self,
        conn: &impl ConnectionTrait,
        state: DispatchState,
    ) -> Result<Vec<String>, InternalError> {
        newsletter::Entity::find()
            .select_only()
            .column(newsletter::Column::Subject)
            .filter(newsletter::Column::Status.eq(state.as_str()))
            .order_by_asc(newsletter::Column::UpdatedAt)
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("newsletters_in_state", e))
    }

    /// Move to `to` only while the stored state is one of `from`
    ///
    /// Returns whether the transition happened.
    pub async fn transition(
        &self,
        conn: &impl ConnectionTrait,
        subject: &str,
        from: &[DispatchState],
        to: DispatchState,
        actor: &str,
    ) -> Result<bool, InternalError> {
        let result = newsletter::Entity::update_many()
            .col_expr(newsletter::Column::Status, Expr::value(to.as_str()))
            .col_expr(newsletter::Column::ModifiedBy, Expr::value(actor))
            .col_expr(newsletter::Column::UpdatedAt, Expr::value(Utc::now().timestamp()))
            .filter(newsletter::Column::Subject.eq(subject))
            .filter(newsletter::Column::Status.is_in(from.iter().map(DispatchState::as_str)))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("transition_newsletter", e))?;
        Ok(result.rows_affected == 1)
    }
}
