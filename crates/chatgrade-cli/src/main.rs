//! Chatgrade CLI
//!
//! The `chatgrade` command scores customer-service transcripts against a
//! remote scoring service and reports per-agent performance.
//!
//! ## Commands
//!
//! - `evaluate`: score a file of transcripts, optionally storing results
//! - `metrics`: aggregate a subject's stored scores
//! - `list`: show a subject's stored score records
//! - `delete`: remove one stored record
//! - `purge`: remove every record of a subject

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chatgrade_core::{
    aggregate_subject, persist_job_results, render_job_summary, write_job_report_json,
    AggregateError, BatchOrchestrator, EvaluationItem, HttpScoringClient, JobReport,
    OrchestratorConfig, ProgressSnapshot, RunController, ScoringConfig,
};
use chatgrade_store::{RecordId, ScoreStore, SurrealScoreStore};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "chatgrade")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade customer-service chatlogs with a remote scoring model", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a batch of transcripts
    ///
    /// While running, type `p` to pause, `r` to resume and `c` to cancel.
    /// Ctrl-C also cancels; the conversation in flight is allowed to finish.
    Evaluate {
        /// JSON array or JSON-lines file of items (objects or bare transcripts)
        #[arg(short, long)]
        input: PathBuf,

        /// Store succeeded scores under this subject (agent)
        #[arg(short, long)]
        subject: Option<String>,

        /// Write a JSON job report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Scoring calls allowed per minute
        #[arg(long, env = "CHATGRADE_RATE_LIMIT")]
        rate_limit: Option<usize>,

        /// Scoring service endpoint
        #[arg(long, env = "CHATGRADE_SCORING_URL")]
        endpoint: Option<String>,

        /// Model identifier
        #[arg(long, env = "CHATGRADE_MODEL")]
        model: Option<String>,
    },

    /// Show aggregated performance metrics for a subject
    Metrics {
        #[arg(short, long)]
        subject: String,

        /// Print metrics as JSON
        #[arg(long = "json-output")]
        json_output: bool,
    },

    /// List a subject's stored score records
    List {
        #[arg(short, long)]
        subject: String,
    },

    /// Delete one stored score record
    Delete {
        /// Record ID
        #[arg(long)]
        id: String,
    },

    /// Delete every stored score record of a subject
    Purge {
        #[arg(short, long)]
        subject: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    chatgrade_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Evaluate {
            input,
            subject,
            report,
            rate_limit,
            endpoint,
            model,
        } => {
            cmd_evaluate(
                &input,
                subject.as_deref(),
                report.as_deref(),
                rate_limit,
                endpoint,
                model,
            )
            .await
        }
        Commands::Metrics {
            subject,
            json_output,
        } => cmd_metrics(&open_store().await?, &subject, json_output).await,
        Commands::List { subject } => cmd_list(&open_store().await?, &subject).await,
        Commands::Delete { id } => cmd_delete(&open_store().await?, &id).await,
        Commands::Purge { subject } => cmd_purge(&open_store().await?, &subject).await,
    }
}

async fn open_store() -> Result<SurrealScoreStore> {
    SurrealScoreStore::from_env()
        .await
        .context("Failed to open score store")
}

/// One input entry: a full item object or a bare transcript string.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputItem {
    Item(EvaluationItem),
    Transcript(String),
}

impl From<InputItem> for EvaluationItem {
    fn from(input: InputItem) -> Self {
        match input {
            InputItem::Item(item) => item,
            InputItem::Transcript(transcript) => EvaluationItem::new(transcript),
        }
    }
}

/// Parse items from a JSON array or from JSON lines.
fn parse_items(content: &str) -> Result<Vec<EvaluationItem>> {
    if content.trim_start().starts_with('[') {
        let entries: Vec<InputItem> =
            serde_json::from_str(content).context("Failed to parse JSON array of items")?;
        return Ok(entries.into_iter().map(Into::into).collect());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<InputItem>(line)
                .map(Into::into)
                .with_context(|| format!("Failed to parse item on line {}", n + 1))
        })
        .collect()
}

fn read_items(path: &Path) -> Result<Vec<EvaluationItem>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    parse_items(&content)
}

fn render_progress(snapshot: &ProgressSnapshot) {
    let eta = snapshot
        .eta_text
        .as_deref()
        .map(|eta| format!(", about {eta} left"))
        .unwrap_or_default();
    eprintln!(
        "[{:>3}%] {}/{} ({} scored, {} failed){} - {}",
        snapshot.percent,
        snapshot.processed,
        snapshot.total,
        snapshot.succeeded,
        snapshot.failed,
        eta,
        snapshot.message
    );
}

/// Read pause/resume/cancel commands from stdin on a plain thread, so a
/// pending read never holds up runtime shutdown.
fn spawn_stdin_controls(control: RunController) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let outcome = match line.trim() {
                "p" | "pause" => control.pause(),
                "r" | "resume" => control.resume(),
                "c" | "cancel" => control.cancel(),
                "" => continue,
                other => {
                    eprintln!("Unknown command {other:?} (p = pause, r = resume, c = cancel)");
                    continue;
                }
            };
            if let Err(e) = outcome {
                eprintln!("{e}");
            }
            if control.is_cancelled() {
                break;
            }
        }
    });
}

async fn cmd_evaluate(
    input: &Path,
    subject: Option<&str>,
    report_path: Option<&Path>,
    rate_limit: Option<usize>,
    endpoint: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let items = read_items(input)?;

    let mut scoring = ScoringConfig::from_env();
    if let Some(endpoint) = endpoint {
        scoring = scoring.with_endpoint(endpoint);
    }
    if let Some(model) = model {
        scoring = scoring.with_model(model);
    }
    let client = HttpScoringClient::new(scoring).context("Failed to create scoring client")?;

    let mut config = OrchestratorConfig::from_env();
    if let Some(n) = rate_limit {
        config = config.with_rate_capacity(n);
    }

    // Open the store before scoring so a bad store config fails fast.
    let store = match subject {
        Some(_) => Some(open_store().await?),
        None => None,
    };

    let orchestrator = BatchOrchestrator::new(Arc::new(client), config);
    let handle = orchestrator.start(items)?;
    info!(job_id = %handle.job_id(), "evaluation started");

    let ctrl_c = handle.controller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current conversation...");
            ctrl_c.cancel().ok();
        }
    });
    spawn_stdin_controls(handle.controller());

    let mut progress = handle.subscribe();
    loop {
        let snapshot = progress.borrow_and_update().clone();
        render_progress(&snapshot);
        if snapshot.is_finished() || progress.changed().await.is_err() {
            break;
        }
    }

    let job = handle.join().await?;
    let report = JobReport::from_job(&job);
    print!("{}", render_job_summary(&report));

    if let Some(path) = report_path {
        write_job_report_json(path, &report)?;
        println!("Report written to {:?}", path);
    }

    if let (Some(store), Some(subject)) = (store, subject) {
        let summary = persist_job_results(&store, subject, &job).await;
        println!(
            "Stored {} score record(s) for '{}'{}",
            summary.stored,
            subject,
            if summary.failed > 0 {
                format!(" ({} failed to store)", summary.failed)
            } else {
                String::new()
            }
        );
    }

    Ok(())
}

async fn cmd_metrics(store: &dyn ScoreStore, subject: &str, json: bool) -> Result<()> {
    let metrics = match aggregate_subject(store, subject).await {
        Ok(m) => m,
        Err(AggregateError::NoData) => {
            println!("{subject}: not yet evaluated");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("Subject:       {}", subject);
    println!("Records:       {}", metrics.record_count);
    println!("Average score: {:.2} / 5", metrics.average_score);
    println!("  Coherence:   {:.2}", metrics.coherence);
    println!("  Politeness:  {:.2}", metrics.politeness);
    println!("  Relevance:   {:.2}", metrics.relevance);
    println!("  Resolution:  {:.0}%", metrics.resolution * 100.0);
    Ok(())
}

async fn cmd_list(store: &dyn ScoreStore, subject: &str) -> Result<()> {
    let records = store.list_by_subject(subject).await?;
    if records.is_empty() {
        println!("No score records for '{}'", subject);
        return Ok(());
    }

    for r in &records {
        println!(
            "{}  {}  C{:.1} P{:.1} R{:.1} res={}  {}",
            r.record_id,
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.coherence,
            r.politeness,
            r.relevance,
            r.resolution,
            r.scenario.as_deref().unwrap_or("-"),
        );
    }
    println!("{} record(s)", records.len());
    Ok(())
}

async fn cmd_delete(store: &dyn ScoreStore, id: &str) -> Result<()> {
    store.delete(&RecordId::from(id)).await?;
    println!("Deleted record {}", id);
    Ok(())
}

async fn cmd_purge(store: &dyn ScoreStore, subject: &str) -> Result<()> {
    let removed = store.delete_all_for_subject(subject).await?;
    println!("Deleted {} record(s) for '{}'", removed, subject);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgrade_store::{MemoryScoreStore, ScoreRecord};

    #[test]
    fn parses_json_array_of_objects_and_strings() {
        let items = parse_items(
            r#"[{"transcript": "Agent: hi", "scenario": "greeting"}, "Customer: where is my parcel?"]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].scenario.as_deref(), Some("greeting"));
        assert_eq!(items[1].transcript, "Customer: where is my parcel?");
    }

    #[test]
    fn parses_json_lines_skipping_blanks() {
        let content = "{\"transcript\": \"a\", \"shift\": \"night\"}\n\n\"b\"\n";
        let items = parse_items(content).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].shift.as_deref(), Some("night"));
        assert_eq!(items[1].transcript, "b");
    }

    #[test]
    fn bad_line_is_reported_by_number() {
        let err = parse_items("\"ok\"\n{not json}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn reads_items_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(&path, "\"one\"\n\"two\"\n").unwrap();
        assert_eq!(read_items(&path).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn metrics_for_unknown_subject_is_not_an_error() {
        let store = MemoryScoreStore::new();
        cmd_metrics(&store, "nobody", false).await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_subject_records() {
        let store = MemoryScoreStore::new();
        store
            .create_many(vec![ScoreRecord::new("amy", 4.0, 4.0, 4.0, 1.0)])
            .await;
        cmd_purge(&store, "amy").await.unwrap();
        assert!(store.is_empty());
    }
}
