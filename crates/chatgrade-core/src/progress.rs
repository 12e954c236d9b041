//! Progress counting, completion estimates and published snapshots.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::{EvaluationJob, RunState};

/// Result class of one processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed,
}

/// Percentage and remaining-time estimate at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub percent: u8,
    pub eta: Option<Duration>,
    pub eta_text: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct CachedEta {
    computed_at: Instant,
    eta: Duration,
}

/// Tracks counts and derives completion estimates.
///
/// The remaining-time estimate is `elapsed / processed * remaining`,
/// recomputed at most once per `refresh` interval.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    processed: usize,
    succeeded: usize,
    failed: usize,
    started: Instant,
    refresh: Duration,
    cached: Option<CachedEta>,
}

impl ProgressTracker {
    pub fn new(total: usize, refresh: Duration) -> Self {
        Self::starting_at(total, refresh, Instant::now())
    }

    pub fn starting_at(total: usize, refresh: Duration, started: Instant) -> Self {
        Self {
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            started,
            refresh,
            cached: None,
        }
    }

    pub fn update(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Succeeded => self.succeeded += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.processed as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn estimate(&mut self) -> Estimate {
        self.estimate_at(Instant::now())
    }

    /// Estimate as of `now`. No ETA before the first item or after the last.
    pub fn estimate_at(&mut self, now: Instant) -> Estimate {
        let eta = if self.processed == 0 || self.processed >= self.total {
            None
        } else {
            Some(self.eta_at(now))
        };
        Estimate {
            percent: self.percent(),
            eta,
            eta_text: eta.map(format_eta),
        }
    }

    fn eta_at(&mut self, now: Instant) -> Duration {
        if let Some(cached) = self.cached {
            if now.saturating_duration_since(cached.computed_at) < self.refresh {
                return cached.eta;
            }
        }
        let elapsed = now.saturating_duration_since(self.started);
        let remaining = (self.total - self.processed) as u32;
        let eta = (elapsed / self.processed as u32) * remaining;
        self.cached = Some(CachedEta {
            computed_at: now,
            eta,
        });
        eta
    }
}

/// Render a remaining-time estimate for people.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs_f64();
    if secs < 60.0 {
        return "less than a minute".to_string();
    }
    let minutes = (secs / 60.0).round() as u64;
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        plural(hours, "hour")
    } else {
        format!("{} {}", plural(hours, "hour"), plural(rest, "minute"))
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Point-in-time view of a job, published after every state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub job_id: Uuid,
    pub state: RunState,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub percent: u8,
    pub eta_text: Option<String>,
    pub message: String,
}

impl ProgressSnapshot {
    /// Placeholder published before any job is attached.
    pub fn idle() -> Self {
        Self {
            job_id: Uuid::nil(),
            state: RunState::Idle,
            total: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            percent: 0,
            eta_text: None,
            message: "Waiting to start".to_string(),
        }
    }

    /// Snapshot of a job that has not started yet.
    pub fn initial(job: &EvaluationJob) -> Self {
        Self {
            job_id: job.job_id(),
            state: job.state(),
            total: job.total(),
            ..Self::idle()
        }
    }

    pub fn from_job(job: &EvaluationJob, estimate: Estimate, message: impl Into<String>) -> Self {
        Self {
            job_id: job.job_id(),
            state: job.state(),
            total: job.total(),
            processed: job.processed(),
            succeeded: job.succeeded(),
            failed: job.failed(),
            percent: estimate.percent,
            eta_text: estimate.eta_text,
            message: message.into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}
