//! The core agent loop of the actor CLI.
//!
//! The agent follows a **send → dispatch → observe** cycle:
//!
//! 1. **Seed** the conversation with a system message and the user prompt
//! 2. **Send** it to the model, with the tool catalog when acting
//! 3. **If tool calls**: dispatch each in order through the permission gate,
//!    append one result per call, loop back to step 2
//! 4. **If text**: that is the final answer
//!
//! The loop ends on a terminal answer, the step limit, an operator abort,
//! an interrupt, or an inference failure.

pub mod dispatch;
pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use dispatch::{DispatchResult, ToolDispatcher};
pub use loop_runner::{AgentLoop, DEFAULT_MAX_STEPS, compose_prompt};
