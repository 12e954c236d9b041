//! Evaluation job: ordered items, run state, and outcome counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::EvaluationItem;
use super::score::ScoreResult;

/// Lifecycle of an evaluation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Cancelled | RunState::Completed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Cancelled => "cancelled",
            RunState::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// An ordered batch of items being scored.
///
/// Counters only move through [`EvaluationJob::record`], which keeps
/// `processed == succeeded + failed` and `processed <= total` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationJob {
    job_id: Uuid,
    items: Vec<EvaluationItem>,
    state: RunState,
    succeeded: usize,
    failed: usize,
    processed: usize,
    results: Vec<ScoreResult>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl EvaluationJob {
    /// Create an idle job over `items`.
    pub fn new(items: Vec<EvaluationItem>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            items,
            state: RunState::Idle,
            succeeded: 0,
            failed: 0,
            processed: 0,
            results: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn items(&self) -> &[EvaluationItem] {
        &self.items
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn remaining(&self) -> usize {
        self.total() - self.processed
    }

    /// Terminal outcomes in processing order.
    pub fn results(&self) -> &[ScoreResult] {
        &self.results
    }

    /// Only the successfully scored results.
    pub fn succeeded_results(&self) -> impl Iterator<Item = &ScoreResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Index of the next item to process, if any remain.
    pub fn next_index(&self) -> Option<usize> {
        (self.processed < self.total()).then_some(self.processed)
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        if self.started_at.is_none() && state == RunState::Running {
            self.started_at = Some(Utc::now());
        }
        if state.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        self.state = state;
    }

    /// Record one terminal item outcome and advance the counters.
    pub(crate) fn record(&mut self, result: ScoreResult) {
        debug_assert!(self.processed < self.total(), "recorded past the last item");
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.processed += 1;
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::score::{ItemErrorKind, ItemFailure, Scores};

    fn job_of(n: usize) -> EvaluationJob {
        EvaluationJob::new((0..n).map(|i| EvaluationItem::new(format!("t{i}"))).collect())
    }

    #[test]
    fn test_new_job_is_idle_and_empty() {
        let job = job_of(3);
        assert_eq!(job.state(), RunState::Idle);
        assert_eq!(job.total(), 3);
        assert_eq!(job.processed(), 0);
        assert_eq!(job.next_index(), Some(0));
        assert!(job.started_at().is_none());
    }

    #[test]
    fn test_record_keeps_counters_consistent() {
        let mut job = job_of(2);
        let item = job.items()[0].clone();
        job.record(ScoreResult::scored(0, &item, Scores::new(4.0, 4.0, 4.0, 1.0)));
        let item = job.items()[1].clone();
        job.record(ScoreResult::failed(
            1,
            &item,
            ItemFailure::new(ItemErrorKind::Transport, "timeout"),
        ));

        assert_eq!(job.succeeded(), 1);
        assert_eq!(job.failed(), 1);
        assert_eq!(job.processed(), job.succeeded() + job.failed());
        assert_eq!(job.remaining(), 0);
        assert_eq!(job.next_index(), None);
        assert_eq!(job.succeeded_results().count(), 1);
    }

    #[test]
    fn test_state_transitions_stamp_times() {
        let mut job = job_of(1);
        job.set_state(RunState::Running);
        assert!(job.started_at().is_some());
        assert!(job.finished_at().is_none());

        job.set_state(RunState::Completed);
        assert!(job.state().is_terminal());
        assert!(job.finished_at().is_some());
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Paused.to_string(), "paused");
        assert_eq!(RunState::Cancelled.to_string(), "cancelled");
    }
}
