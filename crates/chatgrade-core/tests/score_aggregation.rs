//! Persisting job results and aggregating a subject's stored scores.

use std::sync::Arc;

use async_trait::async_trait;
use chatgrade_core::{
    aggregate, aggregate_subject, persist_job_results, AggregateError, BatchOrchestrator,
    EvaluationItem, MemoryScoreStore, OrchestratorConfig, ResolutionScale, ScoreRecord,
    ScoreStore, Scores, ScoringClient, ScoringError, SurrealScoreStore,
};

/// Scores every transcript by its length parity; transcripts starting with
/// "!" fail as garbled responses.
struct ParityClient;

#[async_trait]
impl ScoringClient for ParityClient {
    async fn score(&self, item: &EvaluationItem) -> Result<Scores, ScoringError> {
        if item.transcript.starts_with('!') {
            return Err(ScoringError::InvalidResponse {
                reason: "no JSON object in scoring response".into(),
                raw: Some("I cannot grade this.".into()),
            });
        }
        if item.transcript.len() % 2 == 0 {
            Ok(Scores::new(5.0, 5.0, 5.0, 1.0))
        } else {
            Ok(Scores::new(3.0, 4.0, 3.0, 0.0))
        }
    }
}

fn orchestrator() -> BatchOrchestrator {
    BatchOrchestrator::new(Arc::new(ParityClient), OrchestratorConfig::default())
}

#[tokio::test(start_paused = true)]
async fn persisted_job_results_aggregate_per_subject() {
    let store = MemoryScoreStore::new();
    let job = orchestrator()
        .run(vec![
            EvaluationItem::new("ab").with_scenario("refund"),
            EvaluationItem::new("abc").with_shift("night"),
            EvaluationItem::new("!garbled"),
        ])
        .await
        .unwrap();
    assert_eq!(job.succeeded(), 2);

    let summary = persist_job_results(&store, "agent-42", &job).await;
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.len(), 2);

    let stored = store.list_by_subject("agent-42").await.unwrap();
    assert_eq!(stored[0].scenario.as_deref(), Some("refund"));
    assert_eq!(stored[1].shift.as_deref(), Some("night"));
    let job_id = job.job_id().to_string();
    assert!(stored.iter().all(|r| r.job_id.as_deref() == Some(job_id.as_str())));

    let metrics = aggregate_subject(&store, "agent-42").await.unwrap();
    assert_eq!(metrics.record_count, 2);
    assert!((metrics.coherence - 4.0).abs() < 1e-9);
    assert!((metrics.resolution - 0.5).abs() < 1e-9);
    // 0.25*4 + 0.2*4.5 + 0.25*4 + 0.3*2.5
    assert!((metrics.average_score - 3.65).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_subject_is_not_yet_evaluated() {
    let store = MemoryScoreStore::new();
    let err = aggregate_subject(&store, "new-hire").await.unwrap_err();
    assert!(matches!(err, AggregateError::NoData));
    assert!(err.to_string().contains("not yet evaluated"));
}

#[tokio::test]
async fn aggregation_is_recomputed_after_purge() {
    let store = SurrealScoreStore::in_memory().await.unwrap();
    store
        .create_many(vec![
            ScoreRecord::new("agent-1", 5.0, 5.0, 5.0, 1.0),
            ScoreRecord::new("agent-1", 1.0, 1.0, 1.0, 0.0),
        ])
        .await;

    let first = aggregate_subject(&store, "agent-1").await.unwrap();
    let again = aggregate_subject(&store, "agent-1").await.unwrap();
    assert_eq!(first, again);

    assert_eq!(store.delete_all_for_subject("agent-1").await.unwrap(), 2);
    assert!(matches!(
        aggregate_subject(&store, "agent-1").await,
        Err(AggregateError::NoData)
    ));
}

#[test]
fn legacy_five_point_history_is_normalized() {
    let records = vec![
        ScoreRecord::new("agent-9", 4.0, 4.0, 4.0, 5.0),
        ScoreRecord::new("agent-9", 4.0, 4.0, 4.0, 5.0),
    ];
    let metrics = aggregate(&records).unwrap();
    assert_eq!(metrics.resolution_scale, ResolutionScale::FivePoint);
    assert!((metrics.resolution - 1.0).abs() < 1e-9);
    // 0.25*4 + 0.2*4 + 0.25*4 + 0.3*5
    assert!((metrics.average_score - 4.3).abs() < 1e-9);
}

#[test]
fn mixed_scale_history_is_rejected() {
    let records = vec![
        ScoreRecord::new("agent-9", 4.0, 4.0, 4.0, 0.0),
        ScoreRecord::new("agent-9", 4.0, 4.0, 4.0, 1.0),
        ScoreRecord::new("agent-9", 4.0, 4.0, 4.0, 3.0),
    ];
    assert!(matches!(
        aggregate(&records),
        Err(AggregateError::MixedResolutionScale { index: 2, .. })
    ));
}
