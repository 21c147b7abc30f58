//! Core types and traits for chat-relay
//!
//! This crate provides the session store, configuration loading and
//! logging setup shared by the other chat-relay components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
