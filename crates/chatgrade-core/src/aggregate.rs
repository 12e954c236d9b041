//! Per-subject performance metrics from stored score records.
//!
//! Metrics are recomputed from the full record set on every call; nothing
//! derived is cached or persisted.

use chatgrade_store::{ScoreRecord, ScoreStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WEIGHT_COHERENCE: f64 = 0.25;
pub const WEIGHT_POLITENESS: f64 = 0.20;
pub const WEIGHT_RELEVANCE: f64 = 0.25;
pub const WEIGHT_RESOLUTION: f64 = 0.30;

/// Scale the stored resolution values were read on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionScale {
    /// Already 0–1
    Unit,
    /// Legacy 0–5, divided by 5
    FivePoint,
}

impl ResolutionScale {
    /// Inferred from a single sample: values up to 1 mean 0–1.
    pub fn infer(sample: f64) -> Self {
        if sample <= 1.0 {
            ResolutionScale::Unit
        } else {
            ResolutionScale::FivePoint
        }
    }

    fn divisor(self) -> f64 {
        match self {
            ResolutionScale::Unit => 1.0,
            ResolutionScale::FivePoint => 5.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    /// The subject has no records. Callers show "not yet evaluated".
    #[error("no score records: not yet evaluated")]
    NoData,

    #[error(
        "record {index} has resolution {value} but earlier records use the 0-1 scale; \
         the subject's history mixes resolution scales"
    )]
    MixedResolutionScale { index: usize, value: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Aggregated performance of one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Average on 1–5
    pub coherence: f64,
    /// Average on 1–5
    pub politeness: f64,
    /// Average on 1–5
    pub relevance: f64,
    /// Average normalized to 0–1
    pub resolution: f64,
    pub record_count: usize,
    /// Weighted combination on the 1–5 scale
    pub average_score: f64,
    pub resolution_scale: ResolutionScale,
}

/// Aggregate one subject's records.
pub fn aggregate(records: &[ScoreRecord]) -> Result<PerformanceMetrics, AggregateError> {
    let first = records.first().ok_or(AggregateError::NoData)?;
    let scale = ResolutionScale::infer(first.resolution);

    if scale == ResolutionScale::Unit {
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.resolution > 1.0)
        {
            return Err(AggregateError::MixedResolutionScale {
                index,
                value: record.resolution,
            });
        }
    }

    let n = records.len() as f64;
    let mean = |f: fn(&ScoreRecord) -> f64| records.iter().map(f).sum::<f64>() / n;

    let coherence = mean(|r| r.coherence);
    let politeness = mean(|r| r.politeness);
    let relevance = mean(|r| r.relevance);
    let resolution = mean(|r| r.resolution) / scale.divisor();

    let average_score = WEIGHT_COHERENCE * coherence
        + WEIGHT_POLITENESS * politeness
        + WEIGHT_RELEVANCE * relevance
        + WEIGHT_RESOLUTION * (resolution * 5.0);

    Ok(PerformanceMetrics {
        coherence,
        politeness,
        relevance,
        resolution,
        record_count: records.len(),
        average_score,
        resolution_scale: scale,
    })
}

/// List a subject's records from `store` and aggregate them.
pub async fn aggregate_subject(
    store: &dyn ScoreStore,
    subject: &str,
) -> Result<PerformanceMetrics, AggregateError> {
    let records = store.list_by_subject(subject).await?;
    aggregate(&records)
}
