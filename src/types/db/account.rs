use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Identity key: email address, or "Administrator"/"Guest"
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub enabled: bool,
    pub user_type: String,
    #[sea_orm(unique)]
    pub username: Option<String>,
    pub user_image: Option<String>,
    pub external_id: Option<String>,

    // Password reset state
    pub reset_password_key: Option<String>,
    pub reset_key_issued_at: Option<i64>,
    pub redirect_url: Option<String>,

    pub language: Option<String>,
    pub simultaneous_sessions: i32,

    // Notification preferences
    pub send_welcome_email: bool,
    pub send_password_update_notification: bool,

    pub owner: String,
    pub modified_by: String,
    pub created_at: i64,
    pub updated_at: i64,

    /// Optimistic concurrency counter, bumped on every update
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
