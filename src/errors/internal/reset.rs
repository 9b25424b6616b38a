use thiserror::Error;

/// Password reset and password update errors
#[derive(Error, Debug)]
pub enum ResetError {
    #[error("Cannot update: incorrect or expired link")]
    ExpiredOrInvalidLink,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Exactly one of reset key or old password must be supplied
    #[error("Either a reset key or the current password is required")]
    CredentialRequired,

    #[error("Not allowed to reset the password of {0}")]
    ResetNotAllowed(String),
}

impl ResetError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResetError::ExpiredOrInvalidLink => "expired_or_invalid_link",
            ResetError::InvalidCredentials => "invalid_credentials",
            ResetError::CredentialRequired => "credential_required",
            ResetError::ResetNotAllowed(_) => "reset_not_allowed",
        }
    }
}
