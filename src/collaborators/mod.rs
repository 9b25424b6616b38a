//! Narrow contracts to services the engine calls but does not own
//!
//! Each trait has an in-process implementation so the crate runs on its own;
//! an integrating application swaps in its real password vault, mail
//! transport, session store and job queue.
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::InternalError;
use crate::types::internal::{JobRef, OutboundMail};

pub mod avatar;
pub mod mail_dispatcher;
pub mod quota_oracle;
pub mod session_manager;
pub mod task_queue;

pub use avatar::NoAvatarLookup;
pub use mail_dispatcher::{MemoryMailDispatcher, TracingMailDispatcher};
pub use quota_oracle::StaticQuotaOracle;
pub use session_manager::InMemorySessionManager;
pub use task_queue::TokioTaskQueue;

/// Hashed password storage
#[async_trait]
pub trait PasswordStore: Send + Sync {
    async fn set(&self, account: &str, plaintext: &str) -> Result<(), InternalError>;

    async fn verify(&self, account: &str, plaintext: &str) -> Result<bool, InternalError>;

    /// Move stored credentials to a renamed account
    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), InternalError>;

    async fn remove(&self, account: &str) -> Result<(), InternalError>;
}

/// Outbound mail transport
#[async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), InternalError>;
}

/// Plan limits for a tenant; `None` means unlimited
#[async_trait]
pub trait QuotaOracle: Send + Sync {
    async fn max_system_users(&self, tenant: &str) -> Result<Option<u64>, InternalError>;

    async fn max_email_recipients(&self, tenant: &str) -> Result<Option<u64>, InternalError>;
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn terminate(&self, account: &str) -> Result<(), InternalError>;

    async fn establish(&self, account: &str) -> Result<(), InternalError>;
}

/// Background job queue; jobs carry identity keys only
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, job: JobRef, queue: &str, timeout: Duration) -> Result<(), InternalError>;
}

/// Default avatar resolution for accounts without an image
#[async_trait]
pub trait AvatarLookup: Send + Sync {
    async fn lookup(&self, email: &str) -> Result<Option<String>, InternalError>;
}
