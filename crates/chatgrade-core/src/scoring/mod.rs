//! Scoring client seam.
//!
//! A [`ScoringClient`] turns one transcript into the four quality
//! dimensions, or a typed [`ScoringError`] whose shape the retry logic
//! inspects (HTTP status, diagnostic text, optional wait hint).

pub mod http;
pub mod parse;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{EvaluationItem, Scores};

pub use http::HttpScoringClient;
pub use parse::{extract_content, parse_scores};

/// HTTP status the scoring service uses to signal throttling.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Errors returned by a single scoring call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    /// The service answered with a non-success status.
    #[error("scoring service returned HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Server-advised wait taken from response headers, if any.
        retry_after: Option<Duration>,
    },

    /// The request never got a complete answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded its time budget.
    #[error("scoring call timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered but the scores could not be read.
    #[error("invalid scoring response: {reason}")]
    InvalidResponse { reason: String, raw: Option<String> },
}

impl ScoringError {
    /// Shorthand for a throttling response carrying `message`.
    pub fn throttled(message: impl Into<String>) -> Self {
        ScoringError::Status {
            status: TOO_MANY_REQUESTS,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ScoringError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status() == Some(TOO_MANY_REQUESTS)
    }

    /// Raw payload worth keeping alongside a failed item.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            ScoringError::Status { message, .. } => Some(message.clone()),
            ScoringError::InvalidResponse { raw, .. } => raw.clone(),
            ScoringError::Transport(_) | ScoringError::Timeout(_) => None,
        }
    }
}

/// Scores one transcript against the configured rubric.
///
/// Implementations bound each call by their own timeout; the orchestrator
/// treats [`ScoringError::Timeout`] like any other transport failure.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn score(&self, item: &EvaluationItem) -> Result<Scores, ScoringError>;
}
