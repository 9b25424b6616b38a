use thiserror::Error;

/// Newsletter dispatch and subscription errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Newsletter has already been sent: {0}")]
    AlreadySent(String),

    #[error("Newsletter is already queued for sending: {0}")]
    AlreadyQueued(String),

    #[error("Sending to {requested} recipients exceeds the limit of {limit}")]
    QuotaExceeded { requested: u64, limit: u64 },

    #[error("{doctype} not found: {name}")]
    NotFound { doctype: String, name: String },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Newsletter {0} has no recipients")]
    NoRecipients(String),

    #[error("Invalid link signature")]
    InvalidSignature,

    #[error("Link has expired")]
    LinkExpired,

    #[error("Mail dispatch failed: {0}")]
    Mail(String),

    #[error("Newsletter job {subject} timed out after {seconds}s")]
    Timeout { subject: String, seconds: u64 },
}

impl DispatchError {
    pub fn not_found(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            doctype: doctype.into(),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::AlreadySent(_) => "already_sent",
            DispatchError::AlreadyQueued(_) => "already_queued",
            DispatchError::QuotaExceeded { .. } => "quota_exceeded",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::AlreadyExists(_) => "already_exists",
            DispatchError::NoRecipients(_) => "no_recipients",
            DispatchError::InvalidSignature => "invalid_signature",
            DispatchError::LinkExpired => "link_expired",
            DispatchError::Mail(_) => "mail_error",
            DispatchError::Timeout { .. } => "timeout",
        }
    }
}
