//! Session management module.
//!
//! This module provides the session type with its per-session lock and
//! handler operations, the lifecycle state machine, session tokens, status
//! subscriptions, and the concurrent session store.

mod events;
#[allow(clippy::module_inception)]
mod session;
mod state;
mod store;
mod token;

pub use events::StatusEvents;
pub use session::{LockedSession, Session, SessionTimeouts};
pub use state::Status;
pub use store::SessionStore;
pub use token::{Token, TOKEN_LENGTH};
