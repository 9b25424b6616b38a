use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "newsletters")]
pub struct Model {
    /// The subject line doubles as the identity key
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject: String,
    pub email_group: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub send_from: Option<String>,
    /// Draft, Queued or Sent
    pub status: String,
    pub owner: String,
    pub modified_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
