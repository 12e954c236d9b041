//! In-memory fake for the storage trait
//!
//! `MemoryScoreStore` satisfies the `ScoreStore` contract without any
//! external dependencies. Used by tests and by dry runs of the CLI.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{RecordId, ScoreRecord};
use crate::storage_traits::{ScoreStore, StoreResult};

/// In-memory score store backed by an insertion-ordered `Vec`.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    records: Mutex<Vec<ScoreRecord>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all subjects.
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Vec<ScoreRecord>>> {
        self.records
            .lock()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn create_many(&self, records: Vec<ScoreRecord>) -> Vec<StoreResult<RecordId>> {
        let mut guard = match self.lock() {
            Ok(g) => g,
            Err(e) => {
                let msg = e.to_string();
                return records
                    .iter()
                    .map(|_| Err(StoreError::Backend(msg.clone())))
                    .collect();
            }
        };

        records
            .into_iter()
            .map(|record| {
                if guard.iter().any(|r| r.record_id == record.record_id) {
                    return Err(StoreError::Backend(format!(
                        "duplicate record id: {}",
                        record.record_id
                    )));
                }
                let id = record.record_id.clone();
                guard.push(record);
                Ok(id)
            })
            .collect()
    }

    async fn delete(&self, record_id: &RecordId) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|r| &r.record_id != record_id);
        if guard.len() == before {
            return Err(StoreError::RecordNotFound {
                record_id: record_id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_all_for_subject(&self, subject: &str) -> StoreResult<usize> {
        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|r| r.subject != subject);
        Ok(before - guard.len())
    }

    async fn list_by_subject(&self, subject: &str) -> StoreResult<Vec<ScoreRecord>> {
        let guard = self.lock()?;
        Ok(guard.iter().filter(|r| r.subject == subject).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, coherence: f64) -> ScoreRecord {
        ScoreRecord::new(subject, coherence, 4.0, 4.0, 1.0)
    }

    #[tokio::test]
    async fn create_and_list_preserves_insertion_order() {
        let store = MemoryScoreStore::new();
        let results = store
            .create_many(vec![record("a", 1.0), record("b", 2.0), record("a", 3.0)])
            .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let listed = store.list_by_subject("a").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].coherence, 1.0);
        assert_eq!(listed[1].coherence, 3.0);
    }

    #[tokio::test]
    async fn duplicate_id_fails_only_that_record() {
        let store = MemoryScoreStore::new();
        let first = record("a", 1.0);
        let mut dup = record("a", 2.0);
        dup.record_id = first.record_id.clone();

        let results = store.create_many(vec![first, dup, record("a", 3.0)]).await;
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let store = MemoryScoreStore::new();
        let err = store.delete(&RecordId::from("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_all_for_subject_counts_removed() {
        let store = MemoryScoreStore::new();
        store
            .create_many(vec![record("a", 1.0), record("a", 2.0), record("b", 3.0)])
            .await;

        assert_eq!(store.delete_all_for_subject("a").await.unwrap(), 2);
        assert_eq!(store.delete_all_for_subject("a").await.unwrap(), 0);
        assert_eq!(store.list_by_subject("b").await.unwrap().len(), 1);
    }
}
