//! Operator prompts on the controlling terminal.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

use actor_core::tool::ActionRequest;
use actor_security::{Answer, DenyAll, PromptKind, Prompter};

/// Asks the operator on `/dev/tty`. Stdin may already hold piped context.
pub struct TerminalPrompter {
    input: Mutex<BufReader<File>>,
    output: Mutex<File>,
}

impl TerminalPrompter {
    pub fn open() -> std::io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        let output = tty.try_clone()?;
        Ok(Self {
            input: Mutex::new(BufReader::new(tty)),
            output: Mutex::new(output),
        })
    }

    fn exchange(&self, question: &str) -> std::io::Result<String> {
        if let Ok(mut out) = self.output.lock() {
            write!(out, "\n{question} ")?;
            out.flush()?;
        }
        let mut line = String::new();
        if let Ok(mut input) = self.input.lock() {
            input.read_line(&mut line)?;
        }
        Ok(line)
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&self, kind: PromptKind, request: &ActionRequest) -> Answer {
        let question = format!("{}\n{} > ", kind.question(request), kind.options());
        match self.exchange(&question) {
            Ok(line) => Answer::parse(&line),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read answer from terminal, denying");
                Answer::No
            }
        }
    }
}

/// The terminal prompter, or a deny-all prompter when there is no terminal.
pub fn operator_prompter() -> Box<dyn Prompter> {
    match TerminalPrompter::open() {
        Ok(prompter) => Box::new(prompter),
        Err(e) => {
            tracing::debug!(error = %e, "No controlling terminal; gated actions will be denied");
            Box::new(DenyAll)
        }
    }
}
