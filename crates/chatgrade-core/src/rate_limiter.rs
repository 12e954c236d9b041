//! Sliding-window rate limiter for outbound scoring calls.
//!
//! At most `capacity` admissions are granted in any trailing `window`.
//! The limiter never rejects; it only tells the caller how long to wait.
//!
//! Admissions are issued from a single task, one call at a time, which is
//! what makes a plain FIFO of timestamps sufficient here.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::OrchestratorConfig;

/// FIFO of admission timestamps bounded to `capacity`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    issued: VecDeque<Instant>,
    capacity: usize,
    window: Duration,
    buffer: Duration,
}

impl RateLimiter {
    /// `capacity` is clamped to at least one admission per window.
    pub fn new(capacity: usize, window: Duration, buffer: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            issued: VecDeque::with_capacity(capacity),
            capacity,
            window,
            buffer,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            config.rate_capacity,
            config.rate_window,
            config.admission_buffer,
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of admissions currently remembered.
    pub fn in_window(&self) -> usize {
        self.issued.len()
    }

    /// How long a caller arriving at `now` must wait, or `None` if it may
    /// proceed immediately.
    pub fn admission_delay(&self, now: Instant) -> Option<Duration> {
        if self.issued.len() < self.capacity {
            return None;
        }
        let oldest = *self.issued.front()?;
        let elapsed = now.saturating_duration_since(oldest);
        if elapsed >= self.window {
            None
        } else {
            Some(self.window - elapsed + self.buffer)
        }
    }

    /// Record an admission at `now`, dropping the oldest entry when full.
    pub fn record(&mut self, now: Instant) {
        while self.issued.len() >= self.capacity {
            self.issued.pop_front();
        }
        self.issued.push_back(now);
    }

    /// Wait as long as needed to stay under the limit, then record the
    /// admission.
    pub async fn admit(&mut self) {
        if let Some(delay) = self.admission_delay(Instant::now()) {
            debug!(delay_ms = delay.as_millis() as u64, "rate window full, waiting");
            tokio::time::sleep(delay).await;
        }
        self.record(Instant::now());
    }

    /// Forget every recorded admission.
    ///
    /// Called after a server-mandated cool-down: the server's own counter has
    /// reset, so the local history no longer describes it.
    pub fn reset(&mut self) {
        self.issued.clear();
    }
}
