//! LLM provider integrations for chat-relay
//!
//! This crate provides the provider abstraction and the Hugging Face
//! inference client.

pub mod base;
pub mod huggingface;

pub use base::{
    FailureKind, FailureReason, GenerationOutcome, LLMProvider, LLMResponse, Message,
    ProviderError, ProviderResult,
};
pub use huggingface::HuggingFaceClient;
