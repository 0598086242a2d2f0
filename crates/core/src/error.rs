//! Error types for the actor domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Errors are split into the
//! three tiers the agent loop cares about:
//! - [`ToolError`] is tool-local and is always fed back to the model.
//! - [`AgentError`] is run-fatal and terminates the loop.
//! - [`ProviderError`] is an inference failure, fatal once it reaches the loop.

use std::path::PathBuf;
use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid response from inference server: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Tool-local failures. Never abort a run; the dispatcher renders them as a
/// `tool` message so the model can adapt.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{reason}")]
    PermissionDenied { tool: String, reason: String },

    #[error("path '{path}' is outside working directory '{}'", root.display())]
    SandboxViolation { path: String, root: PathBuf },

    #[error("{reason}")]
    ExecutionFailed { tool: String, reason: String },

    #[error("{tool} is not configured: {reason}")]
    NotConfigured { tool: String, reason: String },

    #[error("interrupted")]
    Interrupted { tool: String },
}

impl ToolError {
    /// Shorthand for a handler failure.
    pub fn failed(tool: &str, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an argument failure.
    pub fn invalid(tool: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// The text fed back to the model for this failure.
    pub fn to_tool_output(&self) -> String {
        format!("Error: {self}")
    }
}

/// Run-fatal failures of the agent loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("step limit of {limit} exceeded without a final answer")]
    StepLimitExceeded { limit: u32 },

    #[error("run aborted by operator")]
    OperatorAborted,

    #[error("run interrupted")]
    Interrupted,

    #[error("inference failed: {0}")]
    Inference(#[from] ProviderError),
}
