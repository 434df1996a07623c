//! Chat completion client
//!
//! One call per user utterance against the OpenRouter chat completions
//! endpoint. Failures are classified into the [`Error`] variants the session
//! speaks friendly replies for.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::{Error, Result};

/// Default completion endpoint
pub const COMPLETION_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Per-request deadline
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Reply length cap, in tokens
const MAX_TOKENS: u32 = 300;

/// Sampling temperature
const TEMPERATURE: f32 = 0.7;

/// Spoken when the API returns a success with no usable content
const FALLBACK_REPLY: &str = "Sorry, I could not understand the response.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for the chat completion API
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Default for CompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionClient {
    /// Create a client against the default endpoint
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(COMPLETION_URL.to_string(), REQUEST_TIMEOUT)
    }

    /// Create a client against a custom endpoint with a custom deadline
    #[must_use]
    pub fn with_endpoint(url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            timeout,
        }
    }

    /// Submit one query and return the assistant's reply text
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] without touching the network if
    /// no API key is configured, [`Error::Timeout`] past the deadline, and
    /// [`Error::Unauthorized`] / [`Error::RateLimited`] / [`Error::Api`] for
    /// the matching HTTP statuses
    pub async fn submit(&self, query: &str, settings: &Settings) -> Result<String> {
        if !settings.has_credential() {
            return Err(Error::MissingCredential);
        }

        let body = ChatRequest {
            model: &settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &settings.system_prompt,
                },
                Message {
                    role: "user",
                    content: query,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(model = %settings.model, chars = query.len(), "submitting completion");

        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .bearer_auth(settings.api_key.trim())
            .header("X-Title", "Vivica Voice Assistant")
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { Error::Timeout } else { e.into() })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "completion API error");
            return Err(match status.as_u16() {
                401 => Error::Unauthorized,
                429 => Error::RateLimited,
                code => Error::Api { status: code },
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| if e.is_timeout() { Error::Timeout } else { e.into() })?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        tracing::info!(chars = reply.len(), "completion reply received");
        Ok(reply)
    }
}
