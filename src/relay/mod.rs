//! Prompt relay to the hosted model.
//!
//! One prompt in, one [`RelayResult`] out. Failures never escape as panics or
//! propagated errors: they are classified into [`RelayError`] so the calling
//! loop can show them and keep going.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub use gemini::GeminiBackend;

/// Failure of a single relay call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The remote service answered with a structured error.
    #[error("API error: {0}")]
    Remote(String),
    /// Anything else: transport faults, malformed or empty payloads.
    #[error("Unexpected error: {0}")]
    Unclassified(String),
}

/// Classification of a [`RelayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteService,
    Unclassified,
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Remote(_) => ErrorKind::RemoteService,
            RelayError::Unclassified(_) => ErrorKind::Unclassified,
        }
    }
}

/// Outcome of one relay call.
pub type RelayResult = Result<String, RelayError>;

/// The text shown to the user for a relay outcome.
pub fn display_text(result: &RelayResult) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(e) => e.to_string(),
    }
}

/// A remote text generation service.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Send `prompt` to `model`. `Ok(None)` means the service answered but
    /// the response carried no text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<Option<String>, RelayError>;
}

/// Forwards prompts to a [`Generate`] backend with a fixed model.
pub struct PromptRelay<G> {
    backend: G,
    model: String,
}

impl<G: Generate> PromptRelay<G> {
    pub fn new(backend: G, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// The model every prompt is sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub fn backend(&self) -> &G {
        &self.backend
    }

    /// Relay one prompt. Exactly one backend call, no retry.
    pub async fn relay(&self, prompt: &str) -> RelayResult {
        debug!(model = %self.model, len = prompt.len(), "Relaying prompt");

        let result = match self.backend.generate(&self.model, prompt).await {
            Ok(Some(text)) => Ok(text.trim().to_string()),
            Ok(None) => Err(RelayError::Unclassified("response contained no text".to_string())),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(kind = ?e.kind(), "Relay failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process backends for exercising the relay and the loops.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with a fixed outcome and records every prompt it sees.
    pub struct ScriptedBackend {
        reply: Result<Option<String>, RelayError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn replying(text: &str) -> Self {
            Self::with(Ok(Some(text.to_string())))
        }

        pub fn failing(error: RelayError) -> Self {
            Self::with(Err(error))
        }

        pub fn empty() -> Self {
            Self::with(Ok(None))
        }

        fn with(reply: Result<Option<String>, RelayError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generate for ScriptedBackend {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
        ) -> Result<Option<String>, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    /// Echoes the prompt back, so each reply is distinguishable.
    pub struct EchoBackend;

    #[async_trait]
    impl Generate for EchoBackend {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
        ) -> Result<Option<String>, RelayError> {
            Ok(Some(format!("echo: {}", prompt)))
        }
    }
}
