//! Google Gemini backend implementation.
//!
//! Talks to the `generateContent` endpoint of the generative language API.

use super::{Generate, RelayError};
use crate::config::{Config, InitError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gemini backend holding the HTTP client and credentials.
///
/// Built once at startup and shared by reference for every prompt.
pub struct GeminiBackend {
    api_base: String,
    api_key: String,
    client: Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend from resolved configuration.
    pub fn new(config: &Config) -> Result<Self, InitError> {
        if config.api_key.trim().is_empty() {
            return Err(InitError::MissingApiKey(crate::config::API_KEY_VAR));
        }

        // No timeout: a call lasts as long as the transport allows.
        let client = Client::builder().build()?;
        Ok(Self::with_client(config, client))
    }

    fn with_client(config: &Config, client: Client) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl Generate for GeminiBackend {
    async fn generate(&self, model: &str, prompt: &str) -> Result<Option<String>, RelayError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Unclassified(format!("failed to reach Gemini API: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Unclassified(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(RelayError::Remote(describe_api_error(status, &body)));
        }

        debug!("Gemini responded with {} bytes", body.len());
        parse_response_text(&body)
    }
}

/// Build the details of a remote-signalled failure.
fn describe_api_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let label = envelope
                .error
                .status
                .unwrap_or_else(|| status.as_u16().to_string());
            format!("{}: {}", label, envelope.error.message)
        }
        Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
    }
}

/// Extract the text of the first candidate, joining all of its text parts.
fn parse_response_text(body: &str) -> Result<Option<String>, RelayError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| RelayError::Unclassified(format!("failed to parse response: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .filter(|text| !text.is_empty());

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{ErrorKind, PromptRelay};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve a single canned HTTP response and hand back the raw request.
    async fn one_shot_server(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (format!("http://{}/v1beta", addr), handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn backend(api_base: String) -> GeminiBackend {
        let config = Config {
            api_key: "test-key".to_string(),
            api_base,
        };
        let client = Client::builder().no_proxy().build().unwrap();
        GeminiBackend::with_client(&config, client)
    }

    #[tokio::test]
    async fn test_success_round_trip() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"  Hi "},{"text":"there!  "}]}}]}"#;
        let (base, server) = one_shot_server("200 OK", body).await;
        let relay = PromptRelay::new(backend(base), "gemini-2.5-flash");

        let result = relay.relay("Hello").await;
        assert_eq!(result, Ok("Hi there!".to_string()));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
        assert!(request.contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""parts":[{"text":"Hello"}]"#));
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let body = r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let (base, _server) = one_shot_server("429 Too Many Requests", body).await;

        let err = backend(base).generate("m", "hi").await.unwrap_err();
        assert_eq!(err, RelayError::Remote("RESOURCE_EXHAUSTED: quota exceeded".to_string()));
        assert_eq!(err.to_string(), "API error: RESOURCE_EXHAUSTED: quota exceeded");
    }

    #[tokio::test]
    async fn test_api_error_without_envelope() {
        let (base, _server) = one_shot_server("503 Service Unavailable", "upstream down").await;

        let err = backend(base).generate("m", "hi").await.unwrap_err();
        assert_eq!(err, RelayError::Remote("HTTP 503: upstream down".to_string()));
    }

    #[tokio::test]
    async fn test_blocked_prompt_has_no_text() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let (base, _server) = one_shot_server("200 OK", body).await;
        let relay = PromptRelay::new(backend(base), "m");

        let err = relay.relay("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let (base, _server) = one_shot_server("200 OK", "not json").await;

        let err = backend(base).generate("m", "hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
    }

    #[tokio::test]
    async fn test_connection_failure_is_unclassified() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(format!("http://{}", addr))
            .generate("m", "hi")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert!(err.to_string().starts_with("Unexpected error: failed to reach Gemini API"));
    }

    #[test]
    fn test_parse_skips_non_text_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"inlineData":{}},{"text":"ok"}]}}]}"#;
        assert_eq!(parse_response_text(body).unwrap(), Some("ok".to_string()));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = GeminiBackend::new(&Config {
            api_key: String::new(),
            api_base: "http://localhost".to_string(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, InitError::MissingApiKey(_)));
    }
}
