//! External service seams — translation and generative extraction.
//!
//! This module provides:
//! * [`Translator`] / [`Generator`] — async traits implemented by all
//!   service backends; shared across tasks as `Arc<dyn …>`.
//! * [`HttpTranslator`] / [`HttpGenerator`] — `reqwest`-based clients for a
//!   translate REST endpoint and an OpenAI-compatible chat endpoint.
//! * [`RetryPolicy`] — exponential-backoff retry shared by the translation
//!   orchestrator and the extraction map phase.
//! * [`ServiceError`] — transient/permanent failure distinction the callers
//!   use to decide retry vs. immediate fallback.

pub mod client;
pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HttpGenerator, HttpTranslator};
pub use retry::RetryPolicy;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Failure of an external service call.
///
/// The transient/permanent split drives recovery: transient errors are
/// retried per the caller's [`RetryPolicy`]; permanent errors trigger the
/// degraded fallback immediately.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Timeout, rate limit, or server-side error — worth retrying.
    #[error("transient service failure: {0}")]
    Transient(String),

    /// Rejected request, auth failure, or unparseable response — retrying
    /// will not help.
    #[error("permanent service failure: {0}")]
    Permanent(String),
}

impl ServiceError {
    /// `true` when the caller's retry policy should attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return ServiceError::Transient(e.to_string());
        }
        match e.status() {
            Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                ServiceError::Transient(e.to_string())
            }
            _ => ServiceError::Permanent(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Translator / Generator traits
// ---------------------------------------------------------------------------

/// Async trait for the external translation capability.
///
/// Implementors must be `Send + Sync` so they can be shared across the
/// worker pool as `Arc<dyn Translator>`.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language` (ISO-639-1 code).
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ServiceError>;
}

/// Async trait for the external generative extraction capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run `prompt` through the generative model and return its text output.
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
