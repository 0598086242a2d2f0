//! Tool dispatch: resolve, validate, confirm, execute.

use std::sync::Arc;

use actor_core::error::{AgentError, ToolError};
use actor_core::message::MessageToolCall;
use actor_core::tool::{ToolCall, ToolRegistry, ToolResult};
use actor_security::{PermissionGate, Verdict};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one dispatched call. The outer `Err` is run-fatal; a
/// `ToolError` is fed back to the model.
pub type DispatchResult = Result<Result<ToolResult, ToolError>, AgentError>;

/// Routes tool calls through the registry and the permission gate.
pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    gate: PermissionGate,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, gate: PermissionGate) -> Self {
        Self { tools, gate }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Dispatch a call exactly as the model sent it, with raw JSON arguments.
    ///
    /// The tool name is resolved before the arguments are parsed, so an
    /// unknown tool is reported as such whatever its arguments look like.
    pub async fn dispatch(&mut self, call: &MessageToolCall, cancel: &CancellationToken) -> DispatchResult {
        if self.tools.get(&call.name).is_none() {
            warn!(tool = %call.name, "Unknown tool requested");
            return Ok(Err(ToolError::UnknownTool(call.name.clone())));
        }

        let arguments = match parse_arguments(&call.name, &call.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                return Ok(Err(e));
            }
        };

        let call = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        };
        self.invoke(&call, cancel).await
    }

    /// Invoke one tool call.
    ///
    /// Order: registry lookup, schema validation, sandbox resolution of the
    /// target (inside `Tool::action`), permission gate, handler. The handler
    /// is raced against `cancel`; losing the race drops it, which kills any
    /// child process group it spawned.
    pub async fn invoke(&mut self, call: &ToolCall, cancel: &CancellationToken) -> DispatchResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            return Ok(Err(ToolError::UnknownTool(call.name.clone())));
        };

        if let Err(reason) = tool.schema().validate(&call.arguments) {
            warn!(tool = %call.name, %reason, "Rejected tool arguments");
            return Ok(Err(ToolError::invalid(&call.name, reason)));
        }

        let action = match tool.action(&call.arguments) {
            Ok(action) => action,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call refused before execution");
                return Ok(Err(e));
            }
        };

        if let Some(request) = action {
            if let Verdict::Denied(reason) = self.gate.check(&request)? {
                return Ok(Err(ToolError::PermissionDenied {
                    tool: call.name.clone(),
                    reason,
                }));
            }
        }

        if cancel.is_cancelled() {
            return Ok(Err(ToolError::Interrupted {
                tool: call.name.clone(),
            }));
        }

        info!(tool = %call.name, args = %call.arguments, "!");
        let start = std::time::Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::Interrupted { tool: call.name.clone() }),
            result = tool.execute(call.arguments.clone()) => result,
        };
        debug!(
            tool = %call.name,
            duration_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Tool finished"
        );

        Ok(result)
    }
}

/// Parse the raw argument string a model sent. Blank means no arguments.
fn parse_arguments(tool: &str, raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
        .map_err(|e| ToolError::invalid(tool, format!("arguments are not valid JSON: {e}")))
}
