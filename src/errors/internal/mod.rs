use thiserror::Error;

pub mod account;
pub mod database;
pub mod dispatch;
pub mod reset;

pub use account::AccountError;
pub use database::DatabaseError;
pub use dispatch::DispatchError;
pub use reset::ResetError;

/// Internal error type for store, provider and coordinator operations
///
/// Hybrid design separates infrastructure errors (shared) from domain errors
/// (one enum per lifecycle area). Thin surfaces map these through `kind()`.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Parse error: failed to parse {value_type}: {message}")]
    Parse {
        value_type: String,
        message: String,
    },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto {
        operation: String,
        message: String,
    },

    /// An external collaborator (password store, session manager, queue) failed
    #[error("Collaborator error: {collaborator}: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Reset(#[from] ResetError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl InternalError {
    pub fn database(operation: &str, source: sea_orm::DbErr) -> InternalError {
        InternalError::Database(DatabaseError::Operation {
            operation: operation.to_string(),
            source,
        })
    }

    pub fn parse(value_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            value_type: value_type.into(),
            message: message.into(),
        }
    }

    pub fn crypto(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Crypto {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error
    pub fn kind(&self) -> &'static str {
        match self {
            InternalError::Database(_) => "database_error",
            InternalError::Parse { .. } => "parse_error",
            InternalError::Crypto { .. } => "crypto_error",
            InternalError::Collaborator { .. } => "collaborator_error",
            InternalError::Account(e) => e.kind(),
            InternalError::Reset(e) => e.kind(),
            InternalError::Dispatch(e) => e.kind(),
        }
    }
}
