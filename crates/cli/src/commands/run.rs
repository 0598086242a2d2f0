//! `ai act` / `ai ask`: run one prompt to a final answer.

use std::sync::Arc;
use std::time::Duration;

use actor_agent::{AgentLoop, compose_prompt};
use actor_config::{AppConfig, ConfigError};
use actor_core::agent::{ModelConfig, RunMode};
use actor_core::error::AgentError;
use actor_providers::OpenAiCompatProvider;
use actor_security::{PathValidationError, PermissionGate, Prompter, SandboxBoundary};
use actor_tools::{ToolSettings, default_registry};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::prompt::operator_prompter;

/// Command-line choices for one run. `None` falls back to configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub prompt: String,
    pub model: Option<String>,
    pub draft: Option<String>,
    pub max_steps: Option<u32>,
}

/// Why a run produced no answer.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("empty prompt")]
    EmptyPrompt,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid working directory: {0}")]
    WorkingDir(#[from] PathValidationError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl RunError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyPrompt | Self::Config(_) | Self::WorkingDir(_) => 1,
            Self::Agent(AgentError::StepLimitExceeded { .. }) => 2,
            Self::Agent(AgentError::OperatorAborted) => 3,
            Self::Agent(AgentError::Inference(_)) => 4,
            Self::Agent(AgentError::Interrupted) => 130,
        }
    }
}

pub async fn run(
    options: RunOptions,
    piped: Option<String>,
    cancel: CancellationToken,
) -> Result<String, RunError> {
    let prompt = compose_prompt(&options.prompt, piped.as_deref());
    if prompt.is_empty() {
        return Err(RunError::EmptyPrompt);
    }

    let config = AppConfig::load()?;
    debug!(?config, "Loaded configuration");

    let boundary = SandboxBoundary::current_dir()?;
    let mut agent = build_agent(&config, &options, &boundary, operator_prompter())?
        .with_cancellation(cancel);

    Ok(agent.run(&prompt, None).await?)
}

/// Wire configuration, flags and the working directory into an agent loop.
fn build_agent(
    config: &AppConfig,
    options: &RunOptions,
    boundary: &SandboxBoundary,
    prompter: Box<dyn Prompter>,
) -> Result<AgentLoop, RunError> {
    let model = model_config(config, options);
    debug!(model = %model.model_id, draft = ?model.draft_model_id, mode = %model.mode, "Model selected");

    let provider = OpenAiCompatProvider::new(
        "lmstudio",
        &config.base_url,
        config.api_key.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .map_err(AgentError::Inference)?;

    let settings = ToolSettings {
        shell_timeout: Duration::from_secs(config.shell.timeout_secs),
        kagi_api_key: config.web.kagi_api_key.clone(),
        fetch_max_bytes: config.web.fetch_max_bytes,
        fetch_max_chars: config.web.fetch_max_chars,
        ..ToolSettings::default()
    };
    let tools = Arc::new(default_registry(boundary, &settings));

    let gate = PermissionGate::new(prompter).with_shell_policy(&config.shell.always_allow, &config.shell.forbidden);

    Ok(AgentLoop::new(Arc::new(provider), model, tools, gate, boundary.root())
        .with_max_steps(options.max_steps.unwrap_or(config.agent.max_steps))
        .with_system_prompt(config.agent.system_prompt_override.clone()))
}

/// Flags win over configuration; each mode has its own default model.
fn model_config(config: &AppConfig, options: &RunOptions) -> ModelConfig {
    let model_id = options.model.clone().unwrap_or_else(|| match options.mode {
        RunMode::Act => config.models.act.clone(),
        RunMode::Ask => config.models.ask.clone(),
    });
    ModelConfig::new(model_id, options.mode)
        .with_draft(options.draft.clone().or_else(|| config.models.draft.clone()))
        .with_temperature(config.temperature)
}
