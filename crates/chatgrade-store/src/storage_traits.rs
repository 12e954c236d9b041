//! Storage trait definitions for chatgrade
//!
//! `ScoreStore` is the only persistence seam the evaluation pipeline needs:
//! batch create, delete by ID, delete by subject, and list by subject.
//! No transactional guarantee is assumed beyond per-record success/failure.
//!
//! All methods are async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{RecordId, ScoreRecord};

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Score record store.
///
/// Guarantees:
/// - `create_many` reports one outcome per input record, in input order.
/// - `list_by_subject` returns records in insertion order.
/// - Deleting an absent subject is a no-op returning 0.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Persist a batch of records. One failed record does not abort the rest.
    async fn create_many(&self, records: Vec<ScoreRecord>) -> Vec<StoreResult<RecordId>>;

    /// Delete one record. Returns `StoreError::RecordNotFound` if absent.
    async fn delete(&self, record_id: &RecordId) -> StoreResult<()>;

    /// Delete every record of a subject, returning how many were removed.
    async fn delete_all_for_subject(&self, subject: &str) -> StoreResult<usize>;

    /// List a subject's records, oldest first.
    async fn list_by_subject(&self, subject: &str) -> StoreResult<Vec<ScoreRecord>>;
}
