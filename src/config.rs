//! Configuration management for gemchat.
//!
//! Everything is resolved from the process environment. A `.env` file in the
//! working directory is loaded first when present; nothing is ever written.

use thiserror::Error;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Environment variable overriding the API base URL.
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";

/// Model used for every request.
pub const MODEL: &str = "gemini-2.5-flash";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Failure to build the client handle at startup.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("{0} is not set. Add it to your environment or a .env file.")]
    MissingApiKey(&'static str),
    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key.
    pub api_key: String,
    /// Base URL of the generative language API, without a trailing slash.
    pub api_base: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, InitError> {
        // A missing .env file is the common case.
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(InitError::MissingApiKey(API_KEY_VAR))?;

        let api_base = lookup(API_BASE_VAR)
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self { api_key, api_base })
    }

    /// The fixed model identifier.
    pub fn model(&self) -> &'static str {
        MODEL
    }
}
