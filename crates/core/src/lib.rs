//! # NextStep Core
//!
//! Domain types, traits, and error definitions for the NextStep
//! career-guidance assistant. This crate has **no framework dependencies**:
//! it defines the model every other crate implements against.
//!
//! The hosted LLM sits behind the [`Provider`] trait, so sessions and flows
//! can be driven by a scripted provider in tests and by Gemini in production.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FailureKind, ProviderError, Result};
pub use message::{Conversation, ConversationId, LabeledTurn, Role, Turn};
pub use provider::{
    ChunkReceiver, GenerationConfig, GenerationRequest, Provider, StreamChunk, Tool, Usage,
};
