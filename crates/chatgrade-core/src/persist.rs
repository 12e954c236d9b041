//! Handing a finished job's scores to the score store.

use chatgrade_store::{RecordId, ScoreRecord, ScoreStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::EvaluationJob;

/// Outcome of persisting one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistSummary {
    pub stored: usize,
    pub failed: usize,
    pub record_ids: Vec<RecordId>,
}

/// Records for every successfully scored item of `job`, attributed to
/// `subject`. Failed items produce no record.
pub fn records_for_job(subject: &str, job: &EvaluationJob) -> Vec<ScoreRecord> {
    let job_id = job.job_id().to_string();
    job.succeeded_results()
        .filter_map(|result| {
            let scores = result.scores()?;
            Some(
                ScoreRecord::new(
                    subject,
                    scores.coherence,
                    scores.politeness,
                    scores.relevance,
                    scores.resolution,
                )
                .with_job(job_id.clone(), result.item_index as u64)
                .with_labels(
                    result.scenario.clone(),
                    result.shift.clone(),
                    result.timestamp,
                ),
            )
        })
        .collect()
}

/// Store the succeeded results of `job`. Per-record failures are logged and
/// counted; they never abort the rest of the batch.
pub async fn persist_job_results(
    store: &dyn ScoreStore,
    subject: &str,
    job: &EvaluationJob,
) -> PersistSummary {
    let records = records_for_job(subject, job);
    if records.is_empty() {
        return PersistSummary::default();
    }

    let mut summary = PersistSummary::default();
    for outcome in store.create_many(records).await {
        match outcome {
            Ok(id) => {
                summary.stored += 1;
                summary.record_ids.push(id);
            }
            Err(e) => {
                summary.failed += 1;
                warn!(subject, error = %e, "failed to store score record");
            }
        }
    }

    info!(
        subject,
        job_id = %job.job_id(),
        stored = summary.stored,
        failed = summary.failed,
        "persisted job results"
    );
    summary
}
