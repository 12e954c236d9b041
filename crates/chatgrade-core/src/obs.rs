//! Structured lifecycle events for evaluation jobs.
//!
//! Every event carries an `event` field (`job.started`, `item.scored`, ...)
//! and the job id, so logs from concurrent jobs can be told apart. Job
//! futures run inside [`job_span`] via `Instrument`, since entered span
//! guards cannot be held across `.await` in spawned tasks.

use std::time::Duration;

use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::domain::{ItemErrorKind, RunState};
use crate::retry::WaitSource;

/// Span tagging everything a job logs with its id.
pub fn job_span(job_id: Uuid) -> Span {
    tracing::info_span!("chatgrade.job", job_id = %job_id)
}

pub fn emit_job_started(job_id: Uuid, total: usize) {
    info!(event = "job.started", job_id = %job_id, total = total);
}

pub fn emit_item_scored(job_id: Uuid, index: usize) {
    info!(event = "item.scored", job_id = %job_id, index = index);
}

/// Failures are warnings: the job goes on without the item.
pub fn emit_item_failed(job_id: Uuid, index: usize, kind: ItemErrorKind, error: &str) {
    warn!(
        event = "item.failed",
        job_id = %job_id,
        index = index,
        kind = %kind,
        error = %error,
    );
}

pub fn emit_throttled(job_id: Uuid, index: usize, wait: Duration, source: WaitSource) {
    warn!(
        event = "item.throttled",
        job_id = %job_id,
        index = index,
        wait_ms = wait.as_millis() as u64,
        source = %source,
    );
}

pub fn emit_job_finished(
    job_id: Uuid,
    state: RunState,
    succeeded: usize,
    failed: usize,
    duration_ms: u64,
) {
    info!(
        event = "job.finished",
        job_id = %job_id,
        state = %state,
        succeeded = succeeded,
        failed = failed,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_emitters_log_event_names() {
        let id = Uuid::new_v4();
        emit_job_started(id, 3);
        emit_item_failed(id, 1, ItemErrorKind::Transport, "connection reset");
        emit_throttled(id, 2, Duration::from_millis(2_500), WaitSource::Message);
        emit_job_finished(id, RunState::Completed, 2, 1, 42);

        assert!(logs_contain("job.started"));
        assert!(logs_contain("item.failed"));
        assert!(logs_contain("connection reset"));
        assert!(logs_contain("wait_ms=2500"));
        assert!(logs_contain("job.finished"));
    }
}
