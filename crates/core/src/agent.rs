//! Run configuration types.

use serde::{Deserialize, Serialize};

/// The two run modes of the command-line agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Tool-calling loop with the full catalog.
    #[default]
    Act,
    /// Single question, no tools; the first response is the answer.
    Ask,
}

impl RunMode {
    /// Whether tools are offered to the model in this mode.
    pub fn uses_tools(self) -> bool {
        matches!(self, Self::Act)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Act => write!(f, "act"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// Which models answer a run. Immutable for the run's duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for inference
    pub model_id: String,

    /// Optional draft model for speculative decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_model_id: Option<String>,

    /// Optional sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Run mode
    #[serde(default)]
    pub mode: RunMode,
}

impl ModelConfig {
    pub fn new(model_id: impl Into<String>, mode: RunMode) -> Self {
        Self {
            model_id: model_id.into(),
            draft_model_id: None,
            temperature: None,
            mode,
        }
    }

    pub fn with_draft(mut self, draft_model_id: Option<String>) -> Self {
        self.draft_model_id = draft_model_id;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}
