//! Persisted score record definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a stored score record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a new random RecordId
    pub fn new() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// One scored conversation, as persisted for a subject (agent).
///
/// `resolution` is kept exactly as it was produced. Historical records may
/// carry it on a 0–5 scale instead of 0–1; aggregation deals with that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub record_id: RecordId,
    /// Agent (or team member) the conversation is attributed to
    pub subject: String,
    /// Evaluation job that produced this record, if any
    pub job_id: Option<String>,
    /// Position of the source transcript in its job
    pub item_index: u64,
    pub coherence: f64,
    pub politeness: f64,
    pub relevance: f64,
    pub resolution: f64,
    pub scenario: Option<String>,
    pub shift: Option<String>,
    /// Timestamp of the conversation itself
    pub timestamp: Option<DateTime<Utc>>,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Create a record with a fresh ID and `created_at = now`.
    pub fn new(
        subject: impl Into<String>,
        coherence: f64,
        politeness: f64,
        relevance: f64,
        resolution: f64,
    ) -> Self {
        Self {
            record_id: RecordId::new(),
            subject: subject.into(),
            job_id: None,
            item_index: 0,
            coherence,
            politeness,
            relevance,
            resolution,
            scenario: None,
            shift: None,
            timestamp: None,
            created_at: Utc::now(),
        }
    }

    /// Attach job provenance.
    pub fn with_job(mut self, job_id: impl Into<String>, item_index: u64) -> Self {
        self.job_id = Some(job_id.into());
        self.item_index = item_index;
        self
    }

    /// Attach the source item's labels.
    pub fn with_labels(
        mut self,
        scenario: Option<String>,
        shift: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        self.scenario = scenario;
        self.shift = shift;
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_are_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }

    #[test]
    fn builder_carries_provenance_and_labels() {
        let record = ScoreRecord::new("agent-7", 4.0, 5.0, 3.0, 1.0)
            .with_job("job-1", 3)
            .with_labels(Some("refund".into()), Some("night".into()), None);

        assert_eq!(record.subject, "agent-7");
        assert_eq!(record.job_id.as_deref(), Some("job-1"));
        assert_eq!(record.item_index, 3);
        assert_eq!(record.scenario.as_deref(), Some("refund"));
        assert_eq!(record.shift.as_deref(), Some("night"));
        assert!(record.timestamp.is_none());
    }
}
