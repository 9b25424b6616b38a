use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::Set;

use crate::errors::InternalError;
use crate::types::db::account;

pub const ADMINISTRATOR: &str = "Administrator";
pub const GUEST: &str = "Guest";

/// Built-in accounts that can never be disabled, renamed or deleted
pub const STANDARD_ACCOUNTS: [&str; 2] = [GUEST, ADMINISTRATOR];

pub const SYSTEM_MANAGER: &str = "System Manager";
pub const ADMINISTRATOR_ROLE: &str = "Administrator";
pub const GUEST_ROLE: &str = "Guest";
pub const ALL_ROLE: &str = "All";

/// Placeholder language value sent by clients before the language list loads
pub const LANGUAGE_PLACEHOLDER: &str = "Loading...";

pub fn is_standard(name: &str) -> bool {
    STANDARD_ACCOUNTS.contains(&name)
}

/// Account classification derived from desk access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    SystemUser,
    WebsiteUser,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::SystemUser => "System User",
            UserType::WebsiteUser => "Website User",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "System User" => Ok(UserType::SystemUser),
            "Website User" => Ok(UserType::WebsiteUser),
            other => Err(InternalError::parse("user_type", format!("unknown user type {:?}", other))),
        }
    }
}

/// Transient plaintext password supplied with a save
///
/// Never persisted on the account; handed to the password store after commit.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(<redacted>)")
    }
}

impl fmt::Display for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[new_password]")
    }
}

/// The account entity as seen by the lifecycle engine
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Identity key
    pub name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub enabled: bool,
    pub user_type: UserType,
    pub username: Option<String>,
    /// Assigned role names, in assignment order
    pub roles: Vec<String>,
    pub user_image: Option<String>,
    pub external_id: Option<String>,
    pub reset_password_key: Option<String>,
    pub reset_key_issued_at: Option<i64>,
    pub redirect_url: Option<String>,
    pub language: Option<String>,
    pub simultaneous_sessions: i32,
    pub send_welcome_email: bool,
    pub send_password_update_notification: bool,
    pub new_password: Option<NewPassword>,
    pub owner: String,
    pub modified_by: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub version: i64,
}

impl Account {
    /// A fresh, unsaved account keyed by its email address
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into().trim().to_string();
        let now = Utc::now().timestamp();
        Self {
            name: email.clone(),
            email,
            first_name: None,
            last_name: None,
            full_name: String::new(),
            enabled: true,
            user_type: UserType::WebsiteUser,
            username: None,
            roles: Vec::new(),
            user_image: None,
            external_id: None,
            reset_password_key: None,
            reset_key_issued_at: None,
            redirect_url: None,
            language: None,
            simultaneous_sessions: 1,
            send_welcome_email: true,
            send_password_update_notification: false,
            new_password: None,
            owner: GUEST.to_string(),
            modified_by: GUEST.to_string(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// A fresh standard account whose identity key is a fixed name
    pub fn standard(name: &str) -> Self {
        let mut account = Self::new(name);
        account.first_name = Some(name.to_string());
        account.send_welcome_email = false;
        account
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.new_password = Some(NewPassword::new(password));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_standard(&self) -> bool {
        is_standard(&self.name)
    }

    pub fn is_administrator(&self) -> bool {
        self.name == ADMINISTRATOR
    }

    pub fn is_guest(&self) -> bool {
        self.name == GUEST
    }

    pub fn holds(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_system_user(&self) -> bool {
        self.user_type == UserType::SystemUser
    }

    /// Append roles that are not yet assigned, preserving order
    pub fn append_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for role in roles {
            let role = role.as_ref();
            if !self.holds(role) {
                self.roles.push(role.to_string());
            }
        }
    }

    pub fn remove_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: Vec<String> = roles.into_iter().map(|r| r.as_ref().to_string()).collect();
        self.roles.retain(|r| !removed.contains(r));
    }

    /// `"Full Name <email>"`, or the bare email when no name is set
    pub fn formatted_email(&self) -> String {
        if self.full_name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.full_name, self.email)
        }
    }

    /// Build the domain account from a stored row and its ordered roles
    pub fn from_model(model: account::Model, roles: Vec<String>) -> Result<Self, InternalError> {
        Ok(Self {
            user_type: model.user_type.parse()?,
            name: model.name,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            full_name: model.full_name,
            enabled: model.enabled,
            username: model.username,
            roles,
            user_image: model.user_image,
            external_id: model.external_id,
            reset_password_key: model.reset_password_key,
            reset_key_issued_at: model.reset_key_issued_at,
            redirect_url: model.redirect_url,
            language: model.language,
            simultaneous_sessions: model.simultaneous_sessions,
            send_welcome_email: model.send_welcome_email,
            send_password_update_notification: model.send_password_update_notification,
            new_password: None,
            owner: model.owner,
            modified_by: model.modified_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        })
    }

    /// Active model with every persisted column set
    pub fn to_active_model(&self) -> account::ActiveModel {
        account::ActiveModel {
            name: Set(self.name.clone()),
            email: Set(self.email.clone()),
            first_name: Set(self.first_name.clone()),
            last_name: Set(self.last_name.clone()),
            full_name: Set(self.full_name.clone()),
            enabled: Set(self.enabled),
            user_type: Set(self.user_type.as_str().to_string()),
            username: Set(self.username.clone()),
            user_image: Set(self.user_image.clone()),
            external_id: Set(self.external_id.clone()),
            reset_password_key: Set(self.reset_password_key.clone()),
            reset_key_issued_at: Set(self.reset_key_issued_at),
            redirect_url: Set(self.redirect_url.clone()),
            language: Set(self.language.clone()),
            simultaneous_sessions: Set(self.simultaneous_sessions),
            send_welcome_email: Set(self.send_welcome_email),
            send_password_update_notification: Set(self.send_password_update_notification),
            owner: Set(self.owner.clone()),
            modified_by: Set(self.modified_by.clone()),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
            version: Set(self.version),
        }
    }
}
