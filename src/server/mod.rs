//! Session-protocol server core.
//!
//! [`SessionManager`] is the façade embedding applications use. It owns the
//! [`SessionStore`](crate::session::SessionStore), routes holder messages
//! through the [`ProtocolRouter`], and runs the expiry [`Sweeper`].

mod manager;
mod router;
mod sweeper;

pub use manager::{ManagerConfig, SessionManager};
pub use router::{parse_path, trim_path, ProtocolResponse, ProtocolRouter, Resource};
pub use sweeper::Sweeper;
