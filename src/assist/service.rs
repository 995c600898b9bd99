use std::fmt;
use std::sync::Arc;

use crate::backend::{BackendError, CompletionBackend, CompletionClientBuilder, FailureKind};
use crate::config::Config;

use super::heuristics;

const SUMMARY_SYSTEM: &str = "You are a helpful assistant that creates concise summaries of text content. Keep summaries under 100 words and focus on the main points.";
const SUMMARY_PROMPT: &str = "Please summarize the following note content:\n\n";

const TAGS_SYSTEM: &str = "You are a helpful assistant that generates relevant tags for text content. Return only a comma-separated list of 3-5 relevant tags, no explanations.";
const TAGS_PROMPT: &str = "Generate relevant tags for the following note content:\n\n";

const IMPROVE_SYSTEM: &str = "You are a helpful writing assistant. Improve the given text by making it clearer, more organized, and better structured while maintaining the original meaning and tone.";
const IMPROVE_PROMPT: &str = "Please improve the following note content:\n\n";

/// The three AI-assist actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistAction {
    Summary,
    Tags,
    Improve,
}

impl fmt::Display for AssistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Summary => "summary",
            Self::Tags => "tags",
            Self::Improve => "improve",
        })
    }
}

/// Why the local heuristics produced a result instead of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No backend is configured for this process.
    Unavailable,
    /// The content was blank, so the backend was not asked.
    EmptyInput,
    /// The backend call failed; the kind is kept for logging and metrics.
    BackendFailed(FailureKind),
    /// The worker running the request panicked.
    WorkerPanicked,
}

/// Where an assist result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistSource {
    Backend,
    Fallback(FallbackReason),
}

impl AssistSource {
    /// Returns true when the local heuristics produced the value.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// An assist result: always a usable value, plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assisted<T> {
    pub value: T,
    pub source: AssistSource,
}

/// Derives summaries, tags and reworded content from note text.
///
/// Whether a backend is available is decided once, when the service is
/// constructed. Every operation falls back to [`heuristics`] when there is no
/// backend, when the content is blank, or when the backend call fails, so
/// callers always receive a usable value.
///
/// # Examples
///
/// ```
/// use ainotes::assist::{AssistService, AssistSource, FallbackReason};
///
/// let service = AssistService::new(None);
/// assert!(!service.status());
///
/// let tags = service.generate_tags("Planning the garden layout for spring");
/// assert_eq!(tags.source, AssistSource::Fallback(FallbackReason::Unavailable));
/// assert_eq!(tags.value, vec!["planning", "garden", "layout", "spring"]);
/// ```
#[derive(Clone)]
pub struct AssistService {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl AssistService {
    /// Creates a service. `None` selects fallback mode for its lifetime.
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        Self { backend }
    }

    /// Creates a service from configuration, connecting a backend client when
    /// an API key is configured.
    ///
    /// A client that cannot be built (for instance an invalid base URL) is
    /// logged and the service runs in fallback mode.
    pub fn from_config(config: &Config) -> Self {
        let Some(api_key) = config.api_key.as_deref() else {
            tracing::info!("no API key configured, AI assist runs in basic mode");
            return Self::new(None);
        };

        let built = CompletionClientBuilder::new()
            .api_key(api_key)
            .base_url(config.base_url.as_str())
            .model(config.model.as_str())
            .timeout(config.backend_timeout)
            .build();

        match built {
            Ok(client) => Self::new(Some(Arc::new(client))),
            Err(e) => {
                tracing::warn!(error = %e, "could not create completion client, using basic mode");
                Self::new(None)
            }
        }
    }

    /// Returns whether a backend is available. Pure query.
    pub fn status(&self) -> bool {
        self.backend.is_some()
    }

    /// Produces a short summary of the content.
    pub fn summarize(&self, content: &str) -> Assisted<String> {
        self.run(
            AssistAction::Summary,
            content,
            SUMMARY_SYSTEM,
            SUMMARY_PROMPT,
            |text| text,
            heuristics::summarize,
        )
    }

    /// Proposes tags for the content.
    ///
    /// Backend replies are split on commas and trimmed; blank entries are
    /// dropped. The backend is asked for three to five tags but its answer is
    /// not truncated.
    pub fn generate_tags(&self, content: &str) -> Assisted<Vec<String>> {
        self.run(
            AssistAction::Tags,
            content,
            TAGS_SYSTEM,
            TAGS_PROMPT,
            |text| parse_tag_list(&text),
            heuristics::extract_tags,
        )
    }

    /// Proposes a clearer version of the content.
    ///
    /// The result is a suggestion; it is never written to a note here.
    pub fn improve_content(&self, content: &str) -> Assisted<String> {
        self.run(
            AssistAction::Improve,
            content,
            IMPROVE_SYSTEM,
            IMPROVE_PROMPT,
            |text| text,
            heuristics::improve,
        )
    }

    /// Asks the backend, or applies `fallback` to the untouched content.
    fn run<T>(
        &self,
        action: AssistAction,
        content: &str,
        system: &str,
        prompt_prefix: &str,
        from_backend: impl FnOnce(String) -> T,
        fallback: impl FnOnce(&str) -> T,
    ) -> Assisted<T> {
        let reason = match &self.backend {
            None => FallbackReason::Unavailable,
            Some(_) if content.trim().is_empty() => FallbackReason::EmptyInput,
            Some(backend) => {
                let prompt = format!("{prompt_prefix}{content}");
                match backend.complete(system, &prompt) {
                    Ok(text) => {
                        return Assisted {
                            value: from_backend(text),
                            source: AssistSource::Backend,
                        };
                    }
                    Err(e) => {
                        log_failure(action, &e);
                        FallbackReason::BackendFailed(e.kind())
                    }
                }
            }
        };

        Assisted {
            value: fallback(content),
            source: AssistSource::Fallback(reason),
        }
    }
}

fn log_failure(action: AssistAction, error: &BackendError) {
    tracing::warn!(
        %action,
        kind = %error.kind(),
        error = %error,
        "backend call failed, using basic fallback"
    );
}

/// Splits a comma-separated tag reply.
fn parse_tag_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}
