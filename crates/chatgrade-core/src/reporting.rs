use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::domain::{EvaluationJob, RunState, ScoreResult};

pub const JOB_REPORT_SCHEMA_VERSION: &str = "1.0";

/// Counts section of the job report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummaryArtifact {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed items per error kind
    pub failures_by_kind: BTreeMap<String, usize>,
}

/// Job report written after an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub job_id: Uuid,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: JobSummaryArtifact,
    pub results: Vec<ScoreResult>,
}

impl JobReport {
    pub fn from_job(job: &EvaluationJob) -> Self {
        let mut failures_by_kind = BTreeMap::new();
        for failure in job.results().iter().filter_map(ScoreResult::failure) {
            *failures_by_kind.entry(failure.kind.to_string()).or_insert(0) += 1;
        }

        Self {
            schema_version: JOB_REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            job_id: job.job_id(),
            state: job.state(),
            started_at: job.started_at(),
            finished_at: job.finished_at(),
            summary: JobSummaryArtifact {
                total: job.total(),
                processed: job.processed(),
                succeeded: job.succeeded(),
                failed: job.failed(),
                failures_by_kind,
            },
            results: job.results().to_vec(),
        }
    }
}

/// Write the job report in pretty JSON format.
pub fn write_job_report_json(path: &Path, report: &JobReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize job report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a short plain-text summary for terminal output.
pub fn render_job_summary(report: &JobReport) -> String {
    let s = &report.summary;
    let mut out = format!(
        "Job {} {}: {} scored, {} failed ({} of {} processed)\n",
        report.job_id, report.state, s.succeeded, s.failed, s.processed, s.total
    );
    for (kind, count) in &s.failures_by_kind {
        out.push_str(&format!("  {kind}: {count}\n"));
    }
    out
}
