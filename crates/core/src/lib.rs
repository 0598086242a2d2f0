//! # Actor Core
//!
//! Domain types, traits, and error definitions for the actor command-line agent.
//! This crate performs no I/O: it defines the domain model
//! that the provider, tool, and agent crates implement against.
//!
//! Every seam is a trait here ([`Provider`], [`Tool`]) so the agent loop can be
//! driven by scripted implementations in tests.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod agent;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, ProviderError, ToolError};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{ActionRequest, ArgKind, ArgSchema, RiskClass, Tool, ToolCall, ToolRegistry, ToolResult};
pub use agent::{ModelConfig, RunMode};
