//! Shell tool: execute a command with arguments, no shell interpolation.
//!
//! The child runs in the working directory, in its own process group, with
//! stdin closed and stdout/stderr merged into one pipe. On timeout, or when
//! the call is dropped because the run was interrupted, the whole process
//! group is killed.

use std::io::Read;
use std::process::Stdio;
use std::time::Duration;

use actor_core::error::ToolError;
use actor_core::tool::{ActionRequest, ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use actor_security::SandboxBoundary;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::file_read::str_arg;

/// Execute commands with a timeout.
pub struct ShellTool {
    boundary: SandboxBoundary,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(boundary: SandboxBoundary, timeout: Duration) -> Self {
        Self { boundary, timeout }
    }

    fn parse<'a>(&self, arguments: &'a serde_json::Value) -> Result<(&'a str, Vec<&'a str>), ToolError> {
        let command = str_arg(self.name(), arguments, "command")?;
        if command.trim().is_empty() {
            return Err(ToolError::invalid(self.name(), "command cannot be missing or empty"));
        }
        let args = arguments["arguments"]
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        Ok((command, args))
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a command with a list of arguments in the working directory. The command is executed \
         directly, not through a shell. Returns the mixed stdout/stderr output and exit code."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Execute
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .required("command", ArgKind::String, "the command to execute")
            .required("arguments", ArgKind::StringList, "list of arguments to pass to the command")
    }

    fn action(&self, arguments: &serde_json::Value) -> Result<Option<ActionRequest>, ToolError> {
        let (command, args) = self.parse(arguments)?;
        Ok(Some(ActionRequest {
            tool: self.name().into(),
            risk: RiskClass::Execute,
            scope: command.into(),
            target: command.into(),
            description: command_line(command, &args),
            irreversible: false,
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let (command, args) = self.parse(&arguments)?;
        debug!(command = %command_line(command, &args), "Executing shell command");

        let (mut reader, writer) = std::io::pipe()
            .map_err(|e| ToolError::failed(self.name(), format!("cannot create pipe: {e}")))?;
        let writer_err = writer
            .try_clone()
            .map_err(|e| ToolError::failed(self.name(), format!("cannot create pipe: {e}")))?;

        let mut cmd = Command::new(command);
        cmd.args(&args)
            .current_dir(self.boundary.root())
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::failed(self.name(), format!("failed to run '{command}': {e}")))?;
        // The parent's copies of the write end must close for the reader to see EOF.
        drop(cmd);

        let mut group = ProcessGroup::new(child.id());
        let collect = tokio::task::spawn_blocking(move || drain(&mut reader));

        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await;
            let output = collect.await.unwrap_or_default();
            (status, output)
        })
        .await;

        let (status, output) = match finished {
            Ok(done) => done,
            Err(_) => {
                warn!(command, timeout_secs = self.timeout.as_secs(), "Command timed out");
                group.kill();
                return Err(ToolError::failed(
                    self.name(),
                    format!("command '{command}' timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };
        group.disarm();

        let status = status
            .map_err(|e| ToolError::failed(self.name(), format!("failed to wait for '{command}': {e}")))?;

        let text = String::from_utf8_lossy(&output);
        let text = if text.trim().is_empty() { "(no output)" } else { text.as_ref() };

        match status.code() {
            Some(0) => Ok(ToolResult::ok(format!("Success (exit code 0):\n{text}"))),
            code => {
                let code = code.unwrap_or(-1);
                debug!(command, exit_code = code, "Command failed");
                Ok(ToolResult::failure(format!("Error (exit code {code}):\n{text}")))
            }
        }
    }
}

/// Read everything from `reader`. A read error keeps what arrived before it.
fn drain(reader: &mut impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf) {
        warn!(error = %e, bytes = buf.len(), "Command output read failed; output may be truncated");
    }
    buf
}

/// Kills the child's process group when dropped, unless disarmed.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    debug!(pgid, "Killing process group");
    // SAFETY: killpg only sends a signal; the group was created for this child.
    unsafe {
        libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {
    // kill_on_drop covers the direct child.
}

/// Render a command line the way a shell user would type it.
fn command_line(command: &str, args: &[&str]) -> String {
    std::iter::once(command)
        .chain(args.iter().copied())
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
