// Providers layer - Work performers and business logic
//
// Providers contain business logic and provide composable operations that
// coordinators can orchestrate. They perform actual work like validation,
// signing, role resolution and cascading writes.

// Provider modules
pub mod account_validator;
pub mod cache_provider;
pub mod cascade_registry;
pub mod crypto_provider;
pub mod default_roles;
pub mod identity_rules;
pub mod link_signer;
pub mod manager_invariant;
pub mod reset_token_provider;
pub mod role_registry;
pub mod share_provider;

// Re-export providers for clean imports
pub use account_validator::{AccountValidator, ValidateOptions, ValidationReport};
pub use cache_provider::{CacheKey, CacheProvider, RoleFlags};
pub use cascade_registry::{AccountReference, CascadeRegistry, PurgeAction, PurgeRule};
pub use crypto_provider::CryptoProvider;
pub use default_roles::{DefaultRoleRule, DefaultRoles, EmailDomainRule, EmailListRule};
pub use link_signer::LinkSigner;
pub use manager_invariant::ManagerInvariant;
pub use reset_token_provider::{ResetLink, ResetTokenProvider};
pub use role_registry::RoleRegistry;
pub use share_provider::{ShareProvider, ACCOUNT_DOCTYPE};
