// Stores layer - data access only
pub mod account_store;
pub mod credential_store;
pub mod email_group_store;
pub mod newsletter_store;
pub mod role_store;
pub mod share_store;

pub use account_store::AccountStore;
pub use credential_store::CredentialStore;
pub use email_group_store::EmailGroupStore;
pub use newsletter_store::NewsletterStore;
pub use role_store::RoleStore;
pub use share_store::{ShareRights, ShareStore};
