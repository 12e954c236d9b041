//! Job-level error taxonomy.
//!
//! Per-item failures are never errors at this level: they are tallied in the
//! job counters. Only the conditions below abort or fail a whole run.

/// Terminal job-level failures surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("no input items: submit at least one transcript")]
    NoInputItems,

    #[error("all {failed} items failed to score; check the scoring service and try again")]
    AllItemsFailed { failed: usize },

    #[error("evaluation task aborted: {0}")]
    TaskAborted(String),
}

/// Result type for job-level operations.
pub type JobResult<T> = std::result::Result<T, JobError>;
