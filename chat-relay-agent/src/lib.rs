//! Agent logic for chat-relay
//!
//! This crate assembles prompts from session history and drives one chat
//! exchange at a time against an inference provider.

pub mod agent;
pub mod context;
pub mod factory;

pub use agent::{AgentSettings, ChatOutcome, ConversationAgent};
pub use context::{ContextBuilder, DEFAULT_SYSTEM_PROMPT};
pub use factory::AgentFactory;
