use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "doc_shares")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub share_doctype: String,
    pub share_name: String,
    /// Account the record is shared with
    pub account: String,
    pub read: bool,
    pub write: bool,
    pub share: bool,
    pub owner: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
