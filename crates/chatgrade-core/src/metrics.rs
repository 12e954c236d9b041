//! Process-wide counters for batch evaluation.
//!
//! Counters are bumped silently by the orchestrator. [`Metrics::flush`]
//! emits them as one `info!` event, which the orchestrator does at the end
//! of every job.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    items_scored: AtomicU64,
    items_failed: AtomicU64,
    throttle_retries: AtomicU64,
    jobs_finished: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            items_scored: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            throttle_retries: AtomicU64::new(0),
            jobs_finished: AtomicU64::new(0),
        }
    }

    pub fn inc_items_scored(&self) {
        self.items_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_scored", "counter incremented");
    }

    pub fn inc_items_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_failed", "counter incremented");
    }

    pub fn inc_throttle_retries(&self) {
        self.throttle_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "throttle_retries", "counter incremented");
    }

    pub fn inc_jobs_finished(&self) {
        self.jobs_finished.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "jobs_finished", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            items_scored = self.items_scored(),
            items_failed = self.items_failed(),
            throttle_retries = self.throttle_retries(),
            jobs_finished = self.jobs_finished(),
        );
    }

    pub fn items_scored(&self) -> u64 {
        self.items_scored.load(Ordering::Relaxed)
    }

    pub fn items_failed(&self) -> u64 {
        self.items_failed.load(Ordering::Relaxed)
    }

    pub fn throttle_retries(&self) -> u64 {
        self.throttle_retries.load(Ordering::Relaxed)
    }

    pub fn jobs_finished(&self) -> u64 {
        self.jobs_finished.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.items_scored.store(0, Ordering::Relaxed);
        self.items_failed.store(0, Ordering::Relaxed);
        self.throttle_retries.store(0, Ordering::Relaxed);
        self.jobs_finished.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_items_scored();
        m.inc_items_scored();
        m.inc_items_failed();
        m.inc_throttle_retries();
        m.inc_jobs_finished();

        assert_eq!(m.items_scored(), 2);
        assert_eq!(m.items_failed(), 1);
        assert_eq!(m.throttle_retries(), 1);
        assert_eq!(m.jobs_finished(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_items_scored();
        m.inc_throttle_retries();
        m.reset();
        assert_eq!(m.items_scored(), 0);
        assert_eq!(m.throttle_retries(), 0);
    }
}
