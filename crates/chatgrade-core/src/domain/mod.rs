//! Domain models for chatgrade.
//!
//! Canonical definitions for the core entities:
//! - `EvaluationItem`: one transcript submitted for scoring
//! - `EvaluationJob`: an ordered batch of items plus run state and counters
//! - `ScoreResult`: the per-item outcome (scores or a classified failure)

pub mod error;
pub mod item;
pub mod job;
pub mod score;

pub use error::{JobError, JobResult};
pub use item::EvaluationItem;
pub use job::{EvaluationJob, RunState};
pub use score::{ItemErrorKind, ItemFailure, ScoreOutcome, ScoreResult, Scores};
