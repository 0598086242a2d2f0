//! The agent reasoning loop implementation.

use std::path::PathBuf;
use std::sync::Arc;

use actor_core::agent::ModelConfig;
use actor_core::error::{AgentError, ToolError};
use actor_core::message::{Conversation, Message};
use actor_core::provider::{Provider, ProviderRequest};
use actor_core::tool::ToolRegistry;
use actor_security::PermissionGate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::ToolDispatcher;

/// Default bound on inference calls per run.
pub const DEFAULT_MAX_STEPS: u32 = 25;

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The inference backend
    provider: Arc<dyn Provider>,

    /// Model, draft model and run mode
    model: ModelConfig,

    /// Registry plus permission gate
    dispatcher: ToolDispatcher,

    /// Working directory named in the system prompt
    working_dir: PathBuf,

    /// Maximum inference calls per run
    max_steps: u32,

    /// Replaces the built-in system prompt when set
    system_prompt_override: Option<String>,

    /// Operator interrupt
    cancel: CancellationToken,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: ModelConfig,
        tools: Arc<ToolRegistry>,
        gate: PermissionGate,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            model,
            dispatcher: ToolDispatcher::new(tools, gate),
            working_dir: working_dir.into(),
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt_override: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the maximum number of inference calls per run.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt_override = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    /// Use an externally owned cancellation token (cancelled on Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The system message this loop seeds conversations with.
    pub fn system_prompt(&self) -> String {
        if let Some(custom) = &self.system_prompt_override {
            return custom.clone();
        }

        let wd = self.working_dir.display();
        if self.model.mode.uses_tools() {
            format!(
                "You are a command-line assistant acting on the user's behalf in the working \
                 directory {wd}.\n\
                 Use the provided tools to inspect and change files, run programs and look \
                 things up on the web. Relative paths are resolved against the working \
                 directory and nothing outside it can be modified. Some actions need the \
                 operator's approval; if one is denied, adapt your plan instead of retrying it.\n\
                 When the task is complete, reply with a concise plain-text answer and no \
                 further tool calls."
            )
        } else {
            format!(
                "You are a helpful command-line assistant. The user is working in {wd}. \
                 Answer directly and concisely."
            )
        }
    }

    /// Build the seeded conversation for a prompt and optional piped input.
    pub fn start_conversation(&self, prompt: &str, piped: Option<&str>) -> Conversation {
        let mut conversation = Conversation::new();
        conversation.push(Message::system(self.system_prompt()));
        conversation.push(Message::user(compose_prompt(prompt, piped)));
        conversation
    }

    /// Run one prompt to a final answer.
    pub async fn run(&mut self, prompt: &str, piped: Option<&str>) -> Result<String, AgentError> {
        let mut conversation = self.start_conversation(prompt, piped);
        self.process(&mut conversation).await
    }

    /// Drive a seeded conversation until the model gives a terminal answer.
    ///
    /// Every tool call in a response gets exactly one `tool` message, in the
    /// order the calls were returned, before the next inference call.
    pub async fn process(&mut self, conversation: &mut Conversation) -> Result<String, AgentError> {
        info!(
            conversation_id = %conversation.id,
            model = %self.model.model_id,
            mode = %self.model.mode,
            "Processing conversation"
        );

        let tool_definitions = if self.model.mode.uses_tools() {
            self.dispatcher.tools().definitions()
        } else {
            Vec::new()
        };

        for step in 1..=self.max_steps {
            if self.cancel.is_cancelled() {
                return Err(AgentError::Interrupted);
            }

            debug!(conversation_id = %conversation.id, step, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.model_id.clone(),
                draft_model: self.model.draft_model_id.clone(),
                messages: conversation.messages().to_vec(),
                temperature: self.model.temperature,
                tools: tool_definitions.clone(),
            };

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AgentError::Interrupted),
                response = self.provider.complete(request) => response?,
            };

            if let Some(usage) = &response.usage {
                debug!(
                    step,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Inference usage"
                );
            }

            let terminal = response.is_terminal();
            let mut message = response.message;

            if !self.model.mode.uses_tools() {
                if !terminal {
                    warn!(count = message.tool_calls.len(), "Ignoring tool calls in ask mode");
                    message.tool_calls.clear();
                }
                let answer = message.content.clone();
                conversation.push(message);
                return Ok(answer);
            }

            if terminal {
                let answer = message.content.clone();
                conversation.push(message);
                return Ok(answer);
            }

            for tc in &mut message.tool_calls {
                if tc.id.is_empty() {
                    tc.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
            }
            if !message.content.trim().is_empty() {
                info!("{}", message.content.trim());
            }

            let tool_calls = message.tool_calls.clone();
            conversation.push(message);

            for (index, tc) in tool_calls.iter().enumerate() {
                let outcome = self.dispatcher.dispatch(tc, &self.cancel).await?;

                match outcome {
                    Ok(result) => {
                        conversation.push(Message::tool_result(&tc.id, &result.output));
                    }
                    Err(ToolError::Interrupted { .. }) => {
                        // Answer every remaining call so the transcript stays well formed.
                        for rest in &tool_calls[index..] {
                            conversation.push(Message::tool_result(&rest.id, "Error: interrupted"));
                        }
                        warn!(tool = %tc.name, "Tool call interrupted");
                        return Err(AgentError::Interrupted);
                    }
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Tool call failed");
                        conversation.push(Message::tool_result(&tc.id, e.to_tool_output()));
                    }
                }
            }
        }

        warn!(
            conversation_id = %conversation.id,
            limit = self.max_steps,
            "Step limit reached without a final answer"
        );
        Err(AgentError::StepLimitExceeded {
            limit: self.max_steps,
        })
    }
}

/// Combine the prompt argument with piped input.
pub fn compose_prompt(prompt: &str, piped: Option<&str>) -> String {
    format!("{prompt}\n\n{}", piped.unwrap_or_default())
        .trim()
        .to_string()
}
