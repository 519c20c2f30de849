//! gemchat - A minimal terminal chat client for hosted Gemini models.
//!
//! Reads a prompt, forwards it to the model, prints the reply, repeats.
//! Runs either as a plain line-oriented loop or as a full-screen chat UI.

mod client;
mod config;
mod conversation;
mod relay;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, InitError};
use relay::{GeminiBackend, PromptRelay};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(author, version, about = "A minimal terminal chat client for Gemini")]
#[command(long_about = "Chat with a hosted Gemini model from your terminal.\n\n\
    Type `quit`, `exit` or `bye` to leave the line-oriented chat.\n\
    The API key is read from GEMINI_API_KEY (a .env file is honoured).")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the full-screen chat UI
    Ui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ui) => handle_ui().await,
        None => {
            init_logging();
            handle_repl().await
        }
    }
}

/// Initialize logging on stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gemchat=warn,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the relay, or report why it could not be built and exit.
///
/// No chat loop is ever entered without a working client.
fn connect_or_exit() -> PromptRelay<GeminiBackend> {
    let connection = Config::from_env().and_then(|config| connect_with(&config));
    match startup_gate(connection, &mut std::io::stderr()) {
        Some(relay) => relay,
        None => std::process::exit(1),
    }
}

fn connect_with(config: &Config) -> Result<PromptRelay<GeminiBackend>, InitError> {
    let backend = GeminiBackend::new(config)?;
    info!("Client ready (model: {}, endpoint: {})", config.model(), config.api_base);
    Ok(PromptRelay::new(backend, config.model()))
}

/// Pass a built client through, or print the startup diagnostic.
fn startup_gate<T, W: Write>(connection: Result<T, InitError>, err: &mut W) -> Option<T> {
    match connection {
        Ok(client) => Some(client),
        Err(e) => {
            // Nothing useful can be done if stderr itself is gone.
            let _ = writeln!(err, "Error initializing client: {}", e);
            let _ = writeln!(
                err,
                "Chatbot initialization failed. Please check your API key and network connection."
            );
            None
        }
    }
}

/// Run the line-oriented chat on stdin/stdout.
async fn handle_repl() -> Result<()> {
    let relay = connect_or_exit();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let session = client::run_repl(&relay, stdin, &mut stdout).await?;

    info!(
        "Session ended ({:?}) after {} prompts to {}",
        session.exit,
        session.prompts,
        relay.model()
    );
    Ok(())
}

/// Run the full-screen chat UI.
async fn handle_ui() -> Result<()> {
    // The renderer owns the terminal, so no log subscriber is installed here.
    let relay = connect_or_exit();
    client::run_tui(&relay).await
}
