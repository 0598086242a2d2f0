//! Security layer for the actor CLI: sandboxing and operator permission.
//!
//! Provides:
//! - **Path validation**: every filesystem tool is confined to the working directory
//! - **Process sandbox**: macOS `sandbox-exec` re-execution restricting writes
//! - **Permission gate**: interactive approval of mutating and shell actions

pub mod path;
pub mod permission;
pub mod sandbox;

pub use path::{PathValidationError, SandboxBoundary};
pub use permission::{
    Answer, DenyAll, PermissionDecision, PermissionGate, PromptKind, Prompter, ScriptedPrompter, Verdict,
};
pub use sandbox::{SandboxError, SandboxState, NO_SANDBOX_FLAG};
