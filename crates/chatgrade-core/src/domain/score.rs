//! Per-item scoring outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::EvaluationItem;

/// Lowest and highest value of the 1–5 rubric dimensions.
pub const RUBRIC_MIN: f64 = 1.0;
pub const RUBRIC_MAX: f64 = 5.0;

/// The four quality dimensions returned by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// 1–5
    pub coherence: f64,
    /// 1–5
    pub politeness: f64,
    /// 1–5
    pub relevance: f64,
    /// 0 (unresolved) or 1 (resolved)
    pub resolution: f64,
}

impl Scores {
    pub fn new(coherence: f64, politeness: f64, relevance: f64, resolution: f64) -> Self {
        Self {
            coherence,
            politeness,
            relevance,
            resolution,
        }
    }

    /// Check every dimension against its bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("coherence", self.coherence),
            ("politeness", self.politeness),
            ("relevance", self.relevance),
        ] {
            if !value.is_finite() || !(RUBRIC_MIN..=RUBRIC_MAX).contains(&value) {
                return Err(format!(
                    "{name} must be between {RUBRIC_MIN} and {RUBRIC_MAX}, got {value}"
                ));
            }
        }
        if self.resolution != 0.0 && self.resolution != 1.0 {
            return Err(format!(
                "resolution must be 0 or 1, got {}",
                self.resolution
            ));
        }
        Ok(())
    }
}

/// Classification of a terminal per-item failure.
///
/// Throttling never appears here: it is retried until the item reaches one
/// of these outcomes or succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// Network failure, timeout, or server-side (5xx) error.
    Transport,
    /// The service answered but the four dimensions could not be read from it.
    InvalidResponse,
    /// The request itself was rejected (blank transcript, 4xx other than 429).
    Validation,
}

impl std::fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemErrorKind::Transport => "transport",
            ItemErrorKind::InvalidResponse => "invalid_response",
            ItemErrorKind::Validation => "validation",
        };
        write!(f, "{s}")
    }
}

/// A classified failure with an optional raw diagnostic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: ItemErrorKind,
    pub message: String,
    pub diagnostic: Option<String>,
}

impl ItemFailure {
    pub fn new(kind: ItemErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: Option<String>) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}

/// Exactly one of scores or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored(Scores),
    Failed(ItemFailure),
}

/// Terminal outcome for one item, carrying the item's labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Position of the source item in its job.
    pub item_index: usize,
    pub scenario: Option<String>,
    pub shift: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub outcome: ScoreOutcome,
}

impl ScoreResult {
    pub fn scored(item_index: usize, item: &EvaluationItem, scores: Scores) -> Self {
        Self::from_item(item_index, item, ScoreOutcome::Scored(scores))
    }

    pub fn failed(item_index: usize, item: &EvaluationItem, failure: ItemFailure) -> Self {
        Self::from_item(item_index, item, ScoreOutcome::Failed(failure))
    }

    fn from_item(item_index: usize, item: &EvaluationItem, outcome: ScoreOutcome) -> Self {
        Self {
            item_index,
            scenario: item.scenario.clone(),
            shift: item.shift.clone(),
            timestamp: item.timestamp,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScoreOutcome::Scored(_))
    }

    pub fn scores(&self) -> Option<&Scores> {
        match &self.outcome {
            ScoreOutcome::Scored(s) => Some(s),
            ScoreOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match &self.outcome {
            ScoreOutcome::Scored(_) => None,
            ScoreOutcome::Failed(f) => Some(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_within_bounds_validate() {
        assert!(Scores::new(1.0, 5.0, 3.5, 1.0).validate().is_ok());
        assert!(Scores::new(4.0, 4.0, 4.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_scores_out_of_bounds_rejected() {
        let err = Scores::new(0.0, 4.0, 4.0, 1.0).validate().unwrap_err();
        assert!(err.contains("coherence"));

        let err = Scores::new(4.0, 6.0, 4.0, 1.0).validate().unwrap_err();
        assert!(err.contains("politeness"));

        let err = Scores::new(4.0, 4.0, f64::NAN, 1.0).validate().unwrap_err();
        assert!(err.contains("relevance"));

        let err = Scores::new(4.0, 4.0, 4.0, 0.5).validate().unwrap_err();
        assert!(err.contains("resolution"));
    }

    #[test]
    fn test_result_carries_item_labels() {
        let item = EvaluationItem::new("t").with_scenario("refund").with_shift("night");
        let result = ScoreResult::scored(4, &item, Scores::new(5.0, 5.0, 5.0, 1.0));

        assert_eq!(result.item_index, 4);
        assert_eq!(result.scenario.as_deref(), Some("refund"));
        assert_eq!(result.shift.as_deref(), Some("night"));
        assert!(result.is_success());
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_failed_result_has_no_scores() {
        let item = EvaluationItem::new("t");
        let failure = ItemFailure::new(ItemErrorKind::Transport, "connection reset")
            .with_diagnostic(Some("raw".to_string()));
        let result = ScoreResult::failed(0, &item, failure);

        assert!(!result.is_success());
        assert!(result.scores().is_none());
        assert_eq!(result.failure().map(|f| f.kind), Some(ItemErrorKind::Transport));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ScoreOutcome::Failed(ItemFailure::new(
            ItemErrorKind::InvalidResponse,
            "missing relevance",
        )))
        .expect("serialize");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "invalid_response");
    }
}
