use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::errors::InternalError;
use crate::types::db::doc_share;

/// Document share grants
#[derive(Debug, Default, Clone)]
pub struct ShareStore;

/// Access flags of a share grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareRights {
    pub read: bool,
    pub write: bool,
    pub share: bool,
}

impl ShareRights {
    pub fn full() -> Self {
        Self {
            read: true,
            write: true,
            share: true,
        }
    }
}

impl ShareStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn find(
        &self,
        conn: &impl ConnectionTrait,
        doctype: &str,
        name: &str,
        account: &str,
    ) -> Result<Option<doc_share::Model>, InternalError> {
        doc_share::Entity::find()
            .filter(doc_share::Column::ShareDoctype.eq(doctype))
            .filter(doc_share::Column::ShareName.eq(name))
            .filter(doc_share::Column::Account.eq(account))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_share", e))
    }

    /// Grant or widen a share; an existing grant has its rights overwritten
    pub async fn upsert(
        &self,
        conn: &impl ConnectionTrait,
        doctype: &str,
        name: &str,
        account: &str,
        rights: ShareRights,
        owner: &str,
    ) -> Result<(), InternalError> {
        if let Some(existing) = self.find(conn, doctype, name, account).await? {
            doc_share::Entity::update_many()
                .col_expr(doc_share::Column::Read, Expr::value(rights.read))
                .col_expr(doc_share::Column::Write, Expr::value(rights.write))
                .col_expr(doc_share::Column::Share, Expr::value(rights.share))
                .filter(doc_share::Column::Id.eq(existing.id))
                .exec(conn)
                .await
                .map_err(|e| InternalError::database("update_share", e))?;
            return Ok(());
        }

        let model = doc_share::ActiveModel {
            share_doctype: Set(doctype.to_string()),
            share_name: Set(name.to_string()),
            account: Set(account.to_string()),
            read: Set(rights.read),
            write: Set(rights.write),
            share: Set(rights.share),
            owner: Set(owner.to_string()),
            created_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };

        doc_share::Entity::insert(model)
            .exec_without_returning(conn)
            .await
            .map_err(|e| InternalError::database("insert_share", e))?;
        Ok(())
    }

    pub async fn remove(
        &self,
        conn: &impl ConnectionTrait,
        doctype: &str,
        name: &str,
        account: &str,
    ) -> Result<u64, InternalError> {
        let result = doc_share::Entity::delete_many()
            .filter(doc_share::Column::ShareDoctype.eq(doctype))
            .filter(doc_share::Column::ShareName.eq(name))
            .filter(doc_share::Column::Account.eq(account))
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("remove_share", e))?;
        Ok(result.rows_affected)
    }
}
