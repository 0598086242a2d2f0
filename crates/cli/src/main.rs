//! `ai`: command-line AI actor backed by a local LM Studio.
//!
//! Commands:
//! - `act`: Work on the prompt using tools (filesystem, shell, web)
//! - `ask`: Answer the prompt directly, no tools
//!
//! Piped standard input is appended to the prompt as extra context.

use std::io::IsTerminal;
use std::process::ExitCode;

use actor_core::agent::RunMode;
use actor_security::SandboxState;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod commands;

#[derive(Parser)]
#[command(
    name = "ai",
    about = "Command-line AI actor with essential tooling, backed by a local LM Studio",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model to use (defaults to the configured model for the command)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Draft model for speculative decoding
    #[arg(long, global = true)]
    draft: Option<String>,

    /// Maximum inference calls before giving up
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_steps: Option<u32>,

    /// Disable the process sandbox (runs sandboxed by default)
    #[arg(long = "no-sandbox", global = true)]
    no_sandbox: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Act using tools
    Act {
        /// Prompt text
        prompt: Option<String>,
    },

    /// Respond without using tools
    Ask {
        /// Prompt text
        prompt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the answer.
    let filter = if cli.verbose { "debug" } else { "warn,actor_agent=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("Error: cannot determine working directory: {e}");
            return ExitCode::from(1);
        }
    };

    // Re-executes under sandbox-exec on macOS; returns only if that is not possible.
    match actor_security::sandbox::enter(cli.no_sandbox, &cwd) {
        Ok(state) => {
            if let Some(notice) = sandbox_notice(state) {
                tracing::warn!("{notice}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    }

    let (mode, prompt) = match cli.command {
        Commands::Act { prompt } => (RunMode::Act, prompt),
        Commands::Ask { prompt } => (RunMode::Ask, prompt),
    };

    let piped = read_piped_stdin();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            signal_token.cancel();
        }
        // A second Ctrl-C exits immediately.
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let options = commands::run::RunOptions {
        mode,
        prompt: prompt.unwrap_or_default(),
        model: cli.model,
        draft: cli.draft,
        max_steps: cli.max_steps,
    };

    match commands::run::run(options, piped, cancel).await {
        Ok(answer) => {
            println!("{answer}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if !matches!(e, commands::run::RunError::EmptyPrompt) {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// What the operator should hear about process-level enforcement.
fn sandbox_notice(state: SandboxState) -> Option<&'static str> {
    match state {
        SandboxState::Disabled => None,
        SandboxState::Unavailable => {
            Some("Process-level sandbox is not available on this platform; only path checks apply")
        }
    }
}

/// Standard input, when it is not a terminal.
fn read_piped_stdin() -> Option<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    match std::io::read_to_string(stdin) {
        Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read piped input");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_after_the_prompt_are_accepted() {
        // The sandbox re-exec appends --no-sandbox after the original arguments.
        let cli = Cli::try_parse_from(["ai", "act", "list files here", "--model", "m", "--no-sandbox"]).unwrap();
        assert!(cli.no_sandbox);
        assert_eq!(cli.model.as_deref(), Some("m"));
        assert!(matches!(cli.command, Commands::Act { prompt: Some(p) } if p == "list files here"));
    }

    #[test]
    fn prompt_is_optional_and_steps_must_be_positive() {
        let cli = Cli::try_parse_from(["ai", "ask"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { prompt: None }));
        assert!(Cli::try_parse_from(["ai", "act", "x", "--max-steps", "0"]).is_err());
    }

    #[test]
    fn only_a_missing_sandbox_is_announced() {
        assert!(sandbox_notice(SandboxState::Disabled).is_none());
        assert!(sandbox_notice(SandboxState::Unavailable).unwrap().contains("only path checks apply"));
    }
}
