use std::fmt;

/// Non-fatal condition reported alongside a successful result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// System Manager was appended because no other enabled manager exists
    SystemManagerAdded,
    /// Requested username belongs to another account and was cleared
    UsernameTaken { username: String },
    /// Alternative username that is currently free
    SuggestedUsername { username: String },
    /// Username contained characters outside `[A-Za-z0-9_]` and was cleared
    UsernameInvalid { username: String },
    WelcomeEmailSent,
    PasswordEmailed,
    /// A notification could not be delivered; the record itself was saved
    NotificationFailed { message: String },
    /// The record was saved but the password store refused the new password
    PasswordNotStored { message: String },
    SessionsNotTerminated { message: String },
    /// Stored credentials could not be moved or removed with the account
    CredentialsNotUpdated { message: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SystemManagerAdded => write!(
                f,
                "Adding System Manager to this account as there must be at least one System Manager"
            ),
            Advisory::UsernameTaken { username } => write!(f, "Username {} already exists", username),
            Advisory::SuggestedUsername { username } => write!(f, "Suggested Username: {}", username),
            Advisory::UsernameInvalid { username } => write!(
                f,
                "Username {} should not contain any special characters other than letters, numbers and underscore",
                username
            ),
            Advisory::WelcomeEmailSent => write!(f, "Welcome email sent"),
            Advisory::PasswordEmailed => write!(f, "New password emailed"),
            Advisory::NotificationFailed { message } => write!(f, "Notification not sent: {}", message),
            Advisory::PasswordNotStored { message } => write!(f, "Password not stored: {}", message),
            Advisory::SessionsNotTerminated { message } => write!(f, "Sessions not terminated: {}", message),
            Advisory::CredentialsNotUpdated { message } => write!(f, "Credentials not updated: {}", message),
        }
    }
}

/// A value together with the advisories raised while producing it
#[derive(Debug, Clone)]
pub struct ActionOutcome<T> {
    pub value: T,
    pub advisories: Vec<Advisory>,
}

impl<T> ActionOutcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }

    pub fn with_advisories(value: T, advisories: Vec<Advisory>) -> Self {
        Self { value, advisories }
    }

    pub fn push(&mut self, advisory: Advisory) {
        tracing::warn!("{}", advisory);
        self.advisories.push(advisory);
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionOutcome<U> {
        ActionOutcome {
            value: f(self.value),
            advisories: self.advisories,
        }
    }

    pub fn has(&self, predicate: impl Fn(&Advisory) -> bool) -> bool {
        self.advisories.iter().any(predicate)
    }
}
