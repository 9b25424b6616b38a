use uuid::Uuid;

use crate::types::internal::account::GUEST;

/// Source of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    API,
    CLI,
    System,
    Worker,
}

/// Request context that flows through all layers
///
/// Carries the acting (session) account so validation can apply the demo
/// restriction, password-path redemption can verify against the session
/// account, and owner/modified_by attribution can be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Unique identifier for this request (for tracing across layers)
    pub request_id: Uuid,

    /// Account the current session belongs to ("Guest" when anonymous)
    pub actor: String,

    pub source: RequestSource,
}

impl RequestContext {
    /// Context for an API request made by an authenticated account
    pub fn for_account(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor: actor.into(),
            source: RequestSource::API,
        }
    }

    /// Context for an anonymous API request
    pub fn guest() -> Self {
        Self::for_account(GUEST)
    }

    /// Context for CLI operations; acts as Administrator
    pub fn for_cli(command_name: &str) -> Self {
        tracing::debug!("CLI context for command {}", command_name);
        Self {
            request_id: Uuid::new_v4(),
            actor: crate::types::internal::account::ADMINISTRATOR.to_string(),
            source: RequestSource::CLI,
        }
    }

    /// Context for internal system operations; acts as Administrator
    pub fn for_system(operation_name: &str) -> Self {
        tracing::debug!("System context for operation {}", operation_name);
        Self {
            request_id: Uuid::new_v4(),
            actor: crate::types::internal::account::ADMINISTRATOR.to_string(),
            source: RequestSource::System,
        }
    }

    /// Context for background jobs, attributed to the account that enqueued them
    pub fn for_worker(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor: actor.into(),
            source: RequestSource::Worker,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.actor == GUEST
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::guest()
    }
}
