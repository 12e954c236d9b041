//! Evaluation input items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of work: a conversation transcript plus optional labels.
///
/// Identity is the item's position in its job. Items are never mutated once
/// a job starts; a throttled item is retried with exactly the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    /// Full text of the conversation.
    pub transcript: String,

    /// Scenario label (e.g. "refund request").
    #[serde(default)]
    pub scenario: Option<String>,

    /// Shift label (e.g. "night").
    #[serde(default)]
    pub shift: Option<String>,

    /// When the conversation happened.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EvaluationItem {
    /// Create an item with only a transcript.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            scenario: None,
            shift: None,
            timestamp: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn with_shift(mut self, shift: impl Into<String>) -> Self {
        self.shift = Some(shift.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// A transcript with no visible content cannot be scored.
    pub fn is_blank(&self) -> bool {
        self.transcript.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_deserializes_with_only_transcript() {
        let item: EvaluationItem =
            serde_json::from_str(r#"{"transcript": "Customer: hi"}"#).expect("deserialize");
        assert_eq!(item, EvaluationItem::new("Customer: hi"));
    }

    #[test]
    fn test_item_labels() {
        let item = EvaluationItem::new("Agent: hello")
            .with_scenario("billing")
            .with_shift("day");
        assert_eq!(item.scenario.as_deref(), Some("billing"));
        assert_eq!(item.shift.as_deref(), Some("day"));
        assert!(!item.is_blank());
    }

    #[test]
    fn test_whitespace_transcript_is_blank() {
        assert!(EvaluationItem::new("  \n\t").is_blank());
    }
}
