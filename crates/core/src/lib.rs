//! # Sentinel Core
//!
//! Domain types, traits, and error definitions for the Sentinel SRE agent.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Layout
//!
//! - [`decision`]: the structured output of the decision policy
//! - [`provider`]: the LLM backend abstraction
//! - [`tool`]: capabilities the orchestrator can invoke
//! - [`message`]: conversation turns
//! - [`event`]: domain events for decoupled observers

pub mod decision;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use decision::{Action, Decision, Severity};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
