use thiserror::Error;

/// Account lifecycle errors
///
/// Every variant aborts the mutation; nothing is persisted.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    /// Guest and Administrator cannot be disabled, renamed or deleted
    #[error("Account {account} cannot be {action}")]
    ProtectedAccount { account: String, action: String },

    #[error("There should remain at least one System Manager")]
    LastManager,

    #[error("Maximum number of system users reached ({limit})")]
    MaxUsersReached { limit: u64 },

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account details cannot be changed by the demo account")]
    DemoRestricted,

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Account {0} was modified concurrently, reload and retry")]
    ConcurrentModification(String),
}

impl AccountError {
    pub fn protected(account: impl Into<String>, action: impl Into<String>) -> Self {
        Self::ProtectedAccount {
            account: account.into(),
            action: action.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountError::InvalidEmail(_) => "invalid_email",
            AccountError::Validation { .. } => "validation_error",
            AccountError::ProtectedAccount { .. } => "protected_account",
            AccountError::LastManager => "last_manager",
            AccountError::MaxUsersReached { .. } => "max_users_reached",
            AccountError::NotFound(_) => "not_found",
            AccountError::DemoRestricted => "demo_restricted",
            AccountError::AlreadyExists(_) => "already_exists",
            AccountError::ConcurrentModification(_) => "concurrent_modification",
        }
    }
}
