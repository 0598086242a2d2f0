//! Inference client implementations for the actor CLI.
//!
//! All providers implement the `actor_core::Provider` trait. The agent loop
//! only ever talks to that trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
