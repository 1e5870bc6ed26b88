//! Shared state types.
//!
//! Contains the builder stage machine and the persistent user record.

mod machine;
mod user;

pub use machine::StageMachine;
pub use user::{User, UserStatus, same_username};
