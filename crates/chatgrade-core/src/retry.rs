//! Retry decisions for failed scoring calls.
//!
//! Throttling (HTTP 429) is always retried on the same item after a wait
//! taken from the server when it offers one. Every other failure is terminal
//! for its item and classified for the job tally.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::config::OrchestratorConfig;
use crate::domain::{ItemErrorKind, ItemFailure};
use crate::scoring::ScoringError;

/// Where a throttle wait came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSource {
    /// `Retry-After` response header
    Header,
    /// Hint embedded in the response text
    Message,
    /// No hint; configured default
    Default,
}

impl std::fmt::Display for WaitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WaitSource::Header => "header",
            WaitSource::Message => "message",
            WaitSource::Default => "default",
        };
        write!(f, "{s}")
    }
}

/// What to do after a failed call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Wait, reset the rate window, then call again for the same item.
    Retry { wait: Duration, source: WaitSource },
    /// Record the failure, cool down, then move to the next item.
    Fail {
        failure: ItemFailure,
        cooldown: Duration,
    },
}

/// Decides between retrying and failing an item.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    default_wait: Duration,
    buffer: Duration,
    failure_cooldown: Duration,
    max_wait: Duration,
}

impl RetryCoordinator {
    pub fn new(default_wait: Duration, buffer: Duration, failure_cooldown: Duration) -> Self {
        Self {
            default_wait,
            buffer,
            failure_cooldown,
            max_wait: Duration::MAX,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            config.default_throttle_wait,
            config.throttle_buffer,
            config.failure_cooldown,
        )
        .with_max_wait(config.max_throttle_wait)
    }

    /// Clamp server-advised waits (before the buffer) to `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn decide(&self, err: &ScoringError) -> RetryDecision {
        if err.is_throttled() {
            let (wait, source) = self.throttle_wait(err);
            return RetryDecision::Retry {
                wait: wait.min(self.max_wait).saturating_add(self.buffer),
                source,
            };
        }

        RetryDecision::Fail {
            failure: ItemFailure::new(classify(err), err.to_string())
                .with_diagnostic(err.diagnostic()),
            cooldown: self.failure_cooldown,
        }
    }

    fn throttle_wait(&self, err: &ScoringError) -> (Duration, WaitSource) {
        match err {
            ScoringError::Status {
                retry_after: Some(wait),
                ..
            } => (*wait, WaitSource::Header),
            ScoringError::Status { message, .. } => match extract_wait_hint(message) {
                Some(wait) => (wait, WaitSource::Message),
                None => (self.default_wait, WaitSource::Default),
            },
            _ => (self.default_wait, WaitSource::Default),
        }
    }
}

/// Map a non-throttling failure onto the item error taxonomy.
pub fn classify(err: &ScoringError) -> ItemErrorKind {
    match err {
        ScoringError::Status { status, .. } if (400..500).contains(status) => {
            ItemErrorKind::Validation
        }
        ScoringError::Status { .. } | ScoringError::Transport(_) | ScoringError::Timeout(_) => {
            ItemErrorKind::Transport
        }
        ScoringError::InvalidResponse { .. } => ItemErrorKind::InvalidResponse,
    }
}

fn hint_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // "retry_after": 5  /  "retry_after_ms": 2500  /  Retry-After: 5
            r#"(?i)retry[_-]?after(?:[_-]?(?P<key_unit>ms|seconds|secs|s))?"?\s*[:=]\s*"?(?P<value>\d+(?:\.\d+)?)\s*(?P<unit>milliseconds|ms|minutes|min|m|seconds|secs|sec|s)?"#,
            // "retryDelay": "5s"
            r#"(?i)retry[_-]?delay"?\s*[:=]\s*"?(?P<value>\d+(?:\.\d+)?)\s*(?P<unit>milliseconds|ms|minutes|min|m|seconds|secs|sec|s)?"#,
            // "Please try again in 5s."
            r#"(?i)try again in\s+(?P<value>\d+(?:\.\d+)?)\s*(?P<unit>milliseconds|ms|minutes|min|m|seconds|secs|sec|s)?"#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Find a server-advised wait in free-form response text.
///
/// Bare numbers are seconds.
pub fn extract_wait_hint(text: &str) -> Option<Duration> {
    hint_patterns().iter().find_map(|re| {
        let caps = re.captures(text)?;
        let value: f64 = caps.name("value")?.as_str().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let unit = caps
            .name("unit")
            .or_else(|| caps.name("key_unit"))
            .map(|m| m.as_str().to_ascii_lowercase());
        let millis_per_unit = match unit.as_deref() {
            Some(u) if u.starts_with("ms") || u.starts_with("milli") => 1.0,
            Some(u) if u == "m" || u.starts_with("min") => 60_000.0,
            _ => 1_000.0,
        };
        Some(Duration::from_millis((value * millis_per_unit).round() as u64))
    })
}
