// Coordinators layer - Workflow orchestration
//
// Coordinators compose store and provider operations into the account
// lifecycle, password reset and newsletter dispatch workflows. They decide
// transaction boundaries and when collaborators are called.

// Coordinator modules
pub mod account_coordinator;
pub mod dispatch_coordinator;
pub mod password_reset_coordinator;

// Re-export coordinators for clean imports
pub use account_coordinator::{AccountCoordinator, SignUpOutcome};
pub use dispatch_coordinator::DispatchCoordinator;
pub use password_reset_coordinator::{PasswordResetCoordinator, Redemption};
