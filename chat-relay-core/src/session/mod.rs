//! Session management for conversation history
//!
//! Sessions live in memory for the lifetime of the process. Each session
//! is guarded by its own lock so that exchanges on one session are
//! serialized while distinct sessions proceed in parallel.

pub mod manager;
pub mod store;

pub use manager::{SessionHandle, SessionStore};
pub use store::{Role, Session, Turn, DEFAULT_SESSION_ID};
