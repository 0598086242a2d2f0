//! Permission gate: per-action operator approval with run-scoped memory.
//!
//! Read-only tools pass straight through. Mutating tools prompt unless the
//! operator chose "always" for that tool. Shell commands prompt unless the
//! command name was allowed before, and can be forbidden for the rest of the
//! run. Directory removal is confirmed every time.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use actor_core::{ActionRequest, AgentError, RiskClass};

/// Cached state of a gated scope within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionDecision {
    #[default]
    Pending,
    Allowed,
    Denied,
}

/// Outcome of a gate check that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// Refused; the reason is fed back to the model.
    Denied(String),
}

/// Which question is being put to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Mutating,
    Execute,
    RemoveDirectory,
}

impl PromptKind {
    /// The question line shown for `request`.
    pub fn question(self, request: &ActionRequest) -> String {
        match self {
            Self::Mutating => format!("Allow {}: {}?", request.tool, request.description),
            Self::Execute => format!("Allow command '{}'?", request.description),
            Self::RemoveDirectory => {
                format!("Delete directory '{}' and all its contents?", request.target)
            }
        }
    }

    /// The answer choices line.
    pub fn options(self) -> &'static str {
        match self {
            Self::Mutating => "  [Y] Yes | [N] No | [A] Always | [Q] Quit",
            Self::Execute => "  [Y] Yes | [N] No | [A] Always | [X] Never | [Q] Quit",
            Self::RemoveDirectory => "  [Y] Yes | [N] No | [Q] Quit",
        }
    }
}

/// An operator's answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Always,
    Never,
    Quit,
}

impl Answer {
    /// Parse a typed answer. Anything unrecognised means No.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" => Self::Yes,
            "A" | "ALWAYS" => Self::Always,
            "X" | "NEVER" => Self::Never,
            "Q" | "QUIT" => Self::Quit,
            _ => Self::No,
        }
    }
}

/// Source of operator answers. Blocking by contract.
pub trait Prompter: Send + Sync {
    fn ask(&self, kind: PromptKind, request: &ActionRequest) -> Answer;
}

/// Prompter for non-interactive runs: everything gated is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl Prompter for DenyAll {
    fn ask(&self, _kind: PromptKind, _request: &ActionRequest) -> Answer {
        Answer::No
    }
}

/// Prompter that replays a fixed list of answers and records every question.
///
/// Once the script runs out every further prompt is answered No.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<(PromptKind, String)>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, as (kind, question line).
    pub fn asked(&self) -> Vec<(PromptKind, String)> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, kind: PromptKind, request: &ActionRequest) -> Answer {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push((kind, kind.question(request)));
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(Answer::No)
    }
}

impl<P: Prompter + ?Sized> Prompter for std::sync::Arc<P> {
    fn ask(&self, kind: PromptKind, request: &ActionRequest) -> Answer {
        (**self).ask(kind, request)
    }
}

/// Decides, per gated action, whether it may run.
pub struct PermissionGate {
    prompter: Box<dyn Prompter>,
    tools: HashMap<String, PermissionDecision>,
    commands: HashMap<String, PermissionDecision>,
}

impl PermissionGate {
    pub fn new(prompter: Box<dyn Prompter>) -> Self {
        Self {
            prompter,
            tools: HashMap::new(),
            commands: HashMap::new(),
        }
    }

    /// Seed the shell caches from configuration.
    pub fn with_shell_policy(mut self, always_allow: &[String], forbidden: &[String]) -> Self {
        for cmd in always_allow {
            self.commands.insert(cmd.clone(), PermissionDecision::Allowed);
        }
        for cmd in forbidden {
            self.commands.insert(cmd.clone(), PermissionDecision::Denied);
        }
        self
    }

    /// The cached decision for a request's scope.
    pub fn decision(&self, request: &ActionRequest) -> PermissionDecision {
        let cache = match request.risk {
            RiskClass::ReadOnly => return PermissionDecision::Allowed,
            RiskClass::Mutating => &self.tools,
            RiskClass::Execute => &self.commands,
        };
        cache.get(&request.scope).copied().unwrap_or_default()
    }

    /// Check a gated action. Fails only when the operator quits the run.
    pub fn check(&mut self, request: &ActionRequest) -> Result<Verdict, AgentError> {
        let verdict = match request.risk {
            RiskClass::ReadOnly => Verdict::Allowed,
            RiskClass::Mutating if request.irreversible => {
                match self.prompter.ask(PromptKind::RemoveDirectory, request) {
                    Answer::Yes => Verdict::Allowed,
                    Answer::Quit => return Err(AgentError::OperatorAborted),
                    _ => Verdict::Denied(denied_action(request)),
                }
            }
            RiskClass::Mutating => self.check_mutating(request)?,
            RiskClass::Execute => self.check_execute(request)?,
        };

        match &verdict {
            Verdict::Allowed => tracing::debug!(tool = %request.tool, scope = %request.scope, "Action allowed"),
            Verdict::Denied(reason) => tracing::warn!(tool = %request.tool, %reason, "Action denied"),
        }
        Ok(verdict)
    }

    fn check_mutating(&mut self, request: &ActionRequest) -> Result<Verdict, AgentError> {
        if self.decision(request) == PermissionDecision::Allowed {
            return Ok(Verdict::Allowed);
        }

        match self.prompter.ask(PromptKind::Mutating, request) {
            Answer::Yes => Ok(Verdict::Allowed),
            Answer::Always => {
                self.tools.insert(request.scope.clone(), PermissionDecision::Allowed);
                Ok(Verdict::Allowed)
            }
            Answer::Quit => Err(AgentError::OperatorAborted),
            Answer::No | Answer::Never => Ok(Verdict::Denied(denied_action(request))),
        }
    }

    fn check_execute(&mut self, request: &ActionRequest) -> Result<Verdict, AgentError> {
        match self.decision(request) {
            PermissionDecision::Allowed => return Ok(Verdict::Allowed),
            PermissionDecision::Denied => {
                return Ok(Verdict::Denied(format!("command '{}' is forbidden", request.scope)));
            }
            PermissionDecision::Pending => {}
        }

        let denied = || Verdict::Denied(format!("command '{}' denied", request.scope));
        match self.prompter.ask(PromptKind::Execute, request) {
            Answer::Yes => Ok(Verdict::Allowed),
            Answer::Always => {
                self.commands.insert(request.scope.clone(), PermissionDecision::Allowed);
                Ok(Verdict::Allowed)
            }
            Answer::Never => {
                self.commands.insert(request.scope.clone(), PermissionDecision::Denied);
                Ok(denied())
            }
            Answer::Quit => Err(AgentError::OperatorAborted),
            Answer::No => Ok(denied()),
        }
    }
}

fn denied_action(request: &ActionRequest) -> String {
    format!("{} on '{}' denied", request.tool, request.target)
}
