/// Text-completion backend module.
///
/// This module provides a blocking HTTP client for OpenAI-compatible chat
/// completion APIs, the `CompletionBackend` trait used to mock it in tests,
/// error classification, and retry handling.
mod client;

pub use client::{
    BackendError, CompletionBackend, CompletionClient, CompletionClientBuilder, DEFAULT_BASE_URL,
    DEFAULT_MODEL, DEFAULT_TIMEOUT, FailureKind, retry_with_backoff,
};
