// Internal domain types shared across stores, providers and coordinators
pub mod account;
pub mod action_outcome;
pub mod context;
pub mod dispatch;

pub use account::{Account, NewPassword, UserType};
pub use action_outcome::{ActionOutcome, Advisory};
pub use context::{RequestContext, RequestSource};
pub use dispatch::{DispatchState, JobRef, Newsletter, OutboundMail, QueuedJob, UnsubscribeParams};
