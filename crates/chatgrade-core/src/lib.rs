//! Chatgrade Core Library
//!
//! Rate-limited, pausable batch scoring of customer-service transcripts and
//! per-subject aggregation of the stored scores.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod persist;
pub mod progress;
pub mod rate_limiter;
pub mod reporting;
pub mod retry;
pub mod run_control;
pub mod scoring;
pub mod telemetry;

pub use aggregate::{
    aggregate, aggregate_subject, AggregateError, PerformanceMetrics, ResolutionScale,
};

pub use config::{OrchestratorConfig, ScoringConfig};

pub use domain::{
    EvaluationItem, EvaluationJob, ItemErrorKind, ItemFailure, JobError, JobResult, RunState,
    ScoreOutcome, ScoreResult, Scores,
};

pub use orchestrator::{BatchOrchestrator, EvaluationHandle};
pub use persist::{persist_job_results, records_for_job, PersistSummary};
pub use progress::{format_eta, ProgressSnapshot, ProgressTracker};
pub use rate_limiter::RateLimiter;
pub use reporting::{render_job_summary, write_job_report_json, JobReport};
pub use retry::{extract_wait_hint, RetryCoordinator, RetryDecision};
pub use run_control::{ControlError, ControlState, RunController};
pub use scoring::{HttpScoringClient, ScoringClient, ScoringError};

pub use chatgrade_store::{
    MemoryScoreStore, RecordId, ScoreRecord, ScoreStore, StoreConfig, StoreError,
    SurrealScoreStore,
};

/// Chatgrade version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
