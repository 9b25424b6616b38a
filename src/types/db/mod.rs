// Database entities - SeaORM models
pub mod account;
pub mod account_role;
pub mod communication;
pub mod credential;
pub mod doc_share;
pub mod email_group;
pub mod email_group_member;
pub mod event;
pub mod newsletter;
pub mod role;
pub mod todo;
