//! Batch orchestrator: drives one evaluation job item by item.
//!
//! Items are processed strictly in order with one scoring call in flight.
//! Before each call the job loop checks the [`RunGate`] (pause / cancel) and
//! the [`RateLimiter`]. Throttled calls are retried on the same item after a
//! server-advised wait; any other failure is recorded against the item and
//! followed by a short cool-down. Every state change is published as a
//! [`ProgressSnapshot`] on a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::domain::{
    EvaluationItem, EvaluationJob, ItemErrorKind, ItemFailure, JobError, JobResult, RunState,
    ScoreResult,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::progress::{ItemOutcome, ProgressSnapshot, ProgressTracker};
use crate::rate_limiter::RateLimiter;
use crate::retry::{RetryCoordinator, RetryDecision};
use crate::run_control::{ControlError, ControlState, Gate, RunController, RunGate};
use crate::scoring::ScoringClient;

/// Runs evaluation jobs against one scoring client.
#[derive(Clone)]
pub struct BatchOrchestrator {
    client: Arc<dyn ScoringClient>,
    config: OrchestratorConfig,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn ScoringClient>, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Score `items` to completion with no external control.
    pub async fn run(&self, items: Vec<EvaluationItem>) -> JobResult<EvaluationJob> {
        let job = Self::new_job(items)?;
        let (progress, _rx) = watch::channel(ProgressSnapshot::initial(&job));
        self.drive(job, RunController::new(), &progress).await
    }

    /// Score `items` under `control`, publishing progress on `progress`.
    pub async fn run_with(
        &self,
        items: Vec<EvaluationItem>,
        control: RunController,
        progress: &watch::Sender<ProgressSnapshot>,
    ) -> JobResult<EvaluationJob> {
        let job = Self::new_job(items)?;
        self.drive(job, control, progress).await
    }

    /// Start scoring `items` on a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, items: Vec<EvaluationItem>) -> JobResult<EvaluationHandle> {
        let job = Self::new_job(items)?;
        let job_id = job.job_id();
        let control = RunController::new();
        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::initial(&job));

        let this = self.clone();
        let task_control = control.clone();
        let task = tokio::spawn(async move { this.drive(job, task_control, &progress_tx).await });

        Ok(EvaluationHandle {
            job_id,
            control,
            progress: progress_rx,
            task,
        })
    }

    fn new_job(items: Vec<EvaluationItem>) -> JobResult<EvaluationJob> {
        if items.is_empty() {
            return Err(JobError::NoInputItems);
        }
        Ok(EvaluationJob::new(items))
    }

    async fn drive(
        &self,
        job: EvaluationJob,
        control: RunController,
        progress: &watch::Sender<ProgressSnapshot>,
    ) -> JobResult<EvaluationJob> {
        let span = obs::job_span(job.job_id());
        let job = JobRun::new(self, job, control, progress)
            .execute()
            .instrument(span)
            .await;

        if job.state() == RunState::Completed && job.succeeded() == 0 {
            return Err(JobError::AllItemsFailed {
                failed: job.failed(),
            });
        }
        Ok(job)
    }
}

/// Why the item loop stopped early.
struct Cancelled;

/// Mutable state of one job execution.
struct JobRun<'a> {
    client: &'a dyn ScoringClient,
    job: EvaluationJob,
    control: RunController,
    gate: RunGate,
    limiter: RateLimiter,
    retry: RetryCoordinator,
    tracker: ProgressTracker,
    progress: &'a watch::Sender<ProgressSnapshot>,
}

impl<'a> JobRun<'a> {
    fn new(
        orchestrator: &'a BatchOrchestrator,
        job: EvaluationJob,
        control: RunController,
        progress: &'a watch::Sender<ProgressSnapshot>,
    ) -> Self {
        let config = &orchestrator.config;
        Self {
            client: orchestrator.client.as_ref(),
            gate: control.gate(config.pause_poll_interval),
            limiter: RateLimiter::from_config(config),
            retry: RetryCoordinator::from_config(config),
            tracker: ProgressTracker::new(job.total(), config.eta_refresh_interval),
            job,
            control,
            progress,
        }
    }

    async fn execute(mut self) -> EvaluationJob {
        let started = Instant::now();
        let job_id = self.job.job_id();

        self.job.set_state(RunState::Running);
        obs::emit_job_started(job_id, self.job.total());
        self.publish(format!("Evaluating {} conversations", self.job.total()));

        let final_state = match self.process_all().await {
            Ok(()) => RunState::Completed,
            Err(Cancelled) => RunState::Cancelled,
        };

        self.job.set_state(final_state);
        METRICS.inc_jobs_finished();
        METRICS.flush();
        obs::emit_job_finished(
            job_id,
            final_state,
            self.job.succeeded(),
            self.job.failed(),
            started.elapsed().as_millis() as u64,
        );

        let message = match final_state {
            RunState::Cancelled => format!(
                "Cancelled after {} of {} conversations",
                self.job.processed(),
                self.job.total()
            ),
            _ => format!(
                "Finished: {} scored, {} failed",
                self.job.succeeded(),
                self.job.failed()
            ),
        };
        self.publish(message);
        self.job
    }

    async fn process_all(&mut self) -> Result<(), Cancelled> {
        while let Some(index) = self.job.next_index() {
            let item = self.job.items()[index].clone();
            self.checkpoint().await?;

            if item.is_blank() {
                let failure = ItemFailure::new(ItemErrorKind::Validation, "transcript is empty");
                self.record_failure(index, &item, failure);
                continue;
            }

            self.process_item(index, &item).await?;
        }
        Ok(())
    }

    /// Score one item, retrying through throttles until it reaches a
    /// terminal outcome.
    async fn process_item(&mut self, index: usize, item: &EvaluationItem) -> Result<(), Cancelled> {
        let job_id = self.job.job_id();
        loop {
            self.checkpoint().await?;
            self.admit(index).await?;

            match self.client.score(item).await {
                Ok(scores) => {
                    self.job.record(ScoreResult::scored(index, item, scores));
                    self.tracker.update(ItemOutcome::Succeeded);
                    METRICS.inc_items_scored();
                    obs::emit_item_scored(job_id, index);
                    self.publish(format!(
                        "Scored conversation {} of {}",
                        index + 1,
                        self.job.total()
                    ));
                    return Ok(());
                }
                Err(err) => match self.retry.decide(&err) {
                    RetryDecision::Retry { wait, source } => {
                        METRICS.inc_throttle_retries();
                        obs::emit_throttled(job_id, index, wait, source);
                        self.publish(format!(
                            "Scoring service is busy, retrying conversation {} in {}s",
                            index + 1,
                            wait.as_secs_f64().ceil() as u64
                        ));
                        self.sleep(wait).await?;
                        self.limiter.reset();
                    }
                    RetryDecision::Fail { failure, cooldown } => {
                        self.record_failure(index, item, failure);
                        self.sleep(cooldown).await?;
                        return Ok(());
                    }
                },
            }
        }
    }

    fn record_failure(&mut self, index: usize, item: &EvaluationItem, failure: ItemFailure) {
        obs::emit_item_failed(self.job.job_id(), index, failure.kind, &failure.message);
        METRICS.inc_items_failed();
        self.job.record(ScoreResult::failed(index, item, failure));
        self.tracker.update(ItemOutcome::Failed);
        self.publish(format!(
            "Conversation {} of {} could not be scored",
            index + 1,
            self.job.total()
        ));
    }

    /// Block while paused; fail on cancellation.
    async fn checkpoint(&mut self) -> Result<(), Cancelled> {
        match self.gate.state() {
            ControlState::Cancelled => return Err(Cancelled),
            ControlState::Paused => {
                self.job.set_state(RunState::Paused);
                self.publish("Paused");
            }
            ControlState::Running => {}
        }

        match self.gate.wait_runnable().await {
            Gate::Cancelled => Err(Cancelled),
            Gate::Proceed => {
                if self.job.state() == RunState::Paused {
                    self.job.set_state(RunState::Running);
                    self.publish("Resumed");
                }
                Ok(())
            }
        }
    }

    /// Wait for a rate slot, then record the admission.
    async fn admit(&mut self, index: usize) -> Result<(), Cancelled> {
        if let Some(delay) = self.limiter.admission_delay(Instant::now()) {
            debug!(index, delay_ms = delay.as_millis() as u64, "rate window full");
            self.publish(format!(
                "Rate limit reached, waiting {}s before the next request",
                delay.as_secs_f64().ceil() as u64
            ));
            self.sleep(delay).await?;
            // a pause requested during the wait takes effect before the call
            self.checkpoint().await?;
        }
        self.limiter.record(Instant::now());
        Ok(())
    }

    async fn sleep(&mut self, duration: std::time::Duration) -> Result<(), Cancelled> {
        match self.gate.sleep(duration).await {
            Gate::Proceed => Ok(()),
            Gate::Cancelled => Err(Cancelled),
        }
    }

    fn publish(&mut self, message: impl Into<String>) {
        let mut estimate = self.tracker.estimate();
        if self.control.is_cancelled() || self.job.state().is_terminal() {
            estimate.eta = None;
            estimate.eta_text = None;
        }
        self.progress
            .send_replace(ProgressSnapshot::from_job(&self.job, estimate, message));
    }
}

/// Caller's handle on a job started with [`BatchOrchestrator::start`].
#[derive(Debug)]
pub struct EvaluationHandle {
    job_id: Uuid,
    control: RunController,
    progress: watch::Receiver<ProgressSnapshot>,
    task: JoinHandle<JobResult<EvaluationJob>>,
}

impl EvaluationHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn pause(&self) -> Result<(), ControlError> {
        self.control.pause()
    }

    pub fn resume(&self) -> Result<(), ControlError> {
        self.control.resume()
    }

    pub fn cancel(&self) -> Result<(), ControlError> {
        self.control.cancel()
    }

    /// Controller shared with the running job, e.g. for a signal handler.
    pub fn controller(&self) -> RunController {
        self.control.clone()
    }

    /// Receiver notified after every published state change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.clone()
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to end.
    pub async fn join(self) -> JobResult<EvaluationJob> {
        self.task
            .await
            .map_err(|e| JobError::TaskAborted(e.to_string()))?
    }
}
