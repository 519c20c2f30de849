//! Line-oriented chat loop on stdin/stdout.

use crate::relay::{display_text, Generate, PromptRelay};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// Inputs that end the session instead of being sent to the model.
pub const SENTINELS: [&str; 3] = ["quit", "exit", "bye"];

const GREETING: &str = "Chatbot: Hello there! I'm your AI assistant powered by Gemini. \
                        What would you like to talk about today?";
const FAREWELL: &str = "Chatbot: Goodbye! 👋";
const PROMPT_MARKER: &str = "You: ";

/// Whether `line` is a sentinel command (trimmed, case-insensitive).
pub fn is_sentinel(line: &str) -> bool {
    let line = line.trim();
    SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(line))
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A sentinel command was entered.
    Sentinel,
    /// Input was closed.
    EndOfInput,
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub exit: Exit,
    /// Number of prompts sent to the model.
    pub prompts: usize,
}

/// Run the read-relay-print loop until a sentinel or end of input.
pub async fn run_repl<G, R, W>(relay: &PromptRelay<G>, input: R, output: &mut W) -> Result<Session>
where
    G: Generate,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut prompts = 0;

    writeln!(output, "{}\n", GREETING)?;

    loop {
        write!(output, "{}", PROMPT_MARKER)?;
        output.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            writeln!(output)?;
            debug!("Input closed after {} prompts", prompts);
            return Ok(Session {
                exit: Exit::EndOfInput,
                prompts,
            });
        };

        if is_sentinel(&line) {
            writeln!(output, "{}", FAREWELL)?;
            return Ok(Session {
                exit: Exit::Sentinel,
                prompts,
            });
        }

        let result = relay.relay(&line).await;
        prompts += 1;
        writeln!(output, "Chatbot: {}", display_text(&result))?;
    }
}
