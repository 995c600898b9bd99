/// Chat-completion HTTP client implementation.
///
/// This module provides `CompletionClient` for making synchronous requests to an
/// OpenAI-compatible `/chat/completions` endpoint, along with error types and
/// a builder for configuration.
use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default API root when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default bound on a single backend request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when calling the completion backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No API key was configured.
    #[error("No API key configured")]
    MissingCredential,

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The backend answered but the reply was unusable.
    #[error("Completion API error: {message}")]
    Api { message: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Coarse classification of a backend failure, kept for observability after
/// the fallback path has taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Credential or URL problems.
    Configuration,
    /// Connection-level failure.
    Network,
    /// The request exceeded its time bound.
    Timeout,
    /// HTTP 401 or 403.
    Auth,
    /// HTTP 429.
    Quota,
    /// Any other non-success status.
    Http,
    /// Unparseable or empty reply.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Http => "http",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

impl BackendError {
    /// Classifies the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential | Self::InvalidUrl(_) => FailureKind::Configuration,
            Self::Network(_) => FailureKind::Network,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Http { status: 401 | 403 } => FailureKind::Auth,
            Self::Http { status: 429 } => FailureKind::Quota,
            Self::Http { .. } => FailureKind::Http,
            Self::Api { .. } | Self::Serialization(_) => FailureKind::Malformed,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// Trait for text-completion backends.
///
/// This trait enables mocking in unit tests; implementations must be shareable
/// with worker threads.
pub trait CompletionBackend: Send + Sync {
    /// Generates text from a system instruction and a user prompt.
    fn complete(&self, system: &str, prompt: &str) -> Result<String, BackendError>;
}

/// Builder for constructing `CompletionClient` instances.
///
/// # Examples
///
/// ```
/// use ainotes::backend::CompletionClientBuilder;
///
/// let client = CompletionClientBuilder::new()
///     .api_key("sk-test")
///     .base_url("http://localhost:8080/v1")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "http://localhost:8080/v1");
/// ```
#[derive(Debug, Default)]
pub struct CompletionClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    retry_delays: Option<Vec<Duration>>,
}

impl CompletionClientBuilder {
    /// Creates a new `CompletionClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key sent as a bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API root, e.g. `https://api.openai.com/v1`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the delays between retries of transient failures. An empty list
    /// disables retries.
    pub fn retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = Some(delays);
        self
    }

    /// Builds the `CompletionClient`.
    ///
    /// # Environment Variables
    ///
    /// Values not set on the builder fall back to `OPENAI_API_KEY`,
    /// `OPENAI_BASE_URL` and `OPENAI_MODEL`, then to the defaults. A missing
    /// or blank API key is an error.
    pub fn build(self) -> Result<CompletionClient, BackendError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(BackendError::MissingCredential)?;

        let base_url = self
            .base_url
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        let model = self
            .model
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        reqwest::Url::parse(&base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(BackendError::Network)?;

        Ok(CompletionClient {
            client,
            api_key,
            base_url,
            model,
            retry_delays: self
                .retry_delays
                .unwrap_or_else(|| vec![Duration::from_millis(500)]),
        })
    }
}

/// Synchronous client for an OpenAI-compatible chat completion API.
///
/// It should be constructed using `CompletionClientBuilder`.
pub struct CompletionClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_delays: Vec<Duration>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionClient {
    /// Returns the API root configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn complete_once(&self, body: &ChatRequest<'_>) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(BackendError::from_reqwest)?;

        let status = response.status();
        let text = response.text().map_err(BackendError::from_reqwest)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %text, "completion request rejected");
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        parse_reply(&text)
    }
}

impl CompletionBackend for CompletionClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        retry_with_backoff(&self.retry_delays, || self.complete_once(&body))
    }
}

/// Extracts the first choice's message text from a chat completion reply.
fn parse_reply(body: &str) -> Result<String, BackendError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(BackendError::Serialization)?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| BackendError::Api {
            message: "Missing message content in completion response".to_string(),
        })
}

/// Retries an operation, sleeping for each of `delays` in turn between
/// attempts.
///
/// Only transient errors (network failures, HTTP 5xx, HTTP 429) are retried.
/// Timeouts are returned immediately so a timeout bounds the whole call.
pub fn retry_with_backoff<F, T>(delays: &[Duration], mut f: F) -> Result<T, BackendError>
where
    F: FnMut() -> Result<T, BackendError>,
{
    let mut last_error = match f() {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for &delay in delays {
        tracing::debug!(error = %last_error, ?delay, "retrying completion request");
        thread::sleep(delay);

        match f() {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

fn should_retry(error: &BackendError) -> bool {
    match error {
        BackendError::Network(_) => true,
        BackendError::Http { status } => *status == 429 || (500..600).contains(status),
        BackendError::Timeout(_)
        | BackendError::MissingCredential
        | BackendError::InvalidUrl(_)
        | BackendError::Api { .. }
        | BackendError::Serialization(_) => false,
    }
}
