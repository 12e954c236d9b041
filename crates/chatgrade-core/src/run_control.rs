//! Pause / resume / cancel signalling between a caller and a running job.
//!
//! The controller owns a `watch` channel holding the current
//! [`ControlState`]. Any number of handles may hold a clone of the
//! controller; the job loop holds a [`RunGate`] and consults it before each
//! network call and during every wait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Requested run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Running,
    Paused,
    Cancelled,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlState::Running => "running",
            ControlState::Paused => "paused",
            ControlState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("cannot {action} a {from} job")]
    InvalidTransition {
        from: ControlState,
        action: &'static str,
    },
}

/// Outcome of waiting on a [`RunGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Cancelled,
}

/// Shared control cell for one job.
#[derive(Debug, Clone)]
pub struct RunController {
    tx: Arc<watch::Sender<ControlState>>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ControlState {
        *self.tx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == ControlState::Cancelled
    }

    /// Running → Paused.
    pub fn pause(&self) -> Result<(), ControlError> {
        self.transition("pause", ControlState::Paused, |s| s == ControlState::Running)
    }

    /// Paused → Running.
    pub fn resume(&self) -> Result<(), ControlError> {
        self.transition("resume", ControlState::Running, |s| s == ControlState::Paused)
    }

    /// Running or Paused → Cancelled. Cancellation is final.
    pub fn cancel(&self) -> Result<(), ControlError> {
        self.transition("cancel", ControlState::Cancelled, |s| {
            s != ControlState::Cancelled
        })
    }

    /// Gate for the job loop. `poll_interval` bounds how long a paused job
    /// sleeps between re-checks even if no change notification arrives.
    pub fn gate(&self, poll_interval: Duration) -> RunGate {
        RunGate {
            rx: self.tx.subscribe(),
            poll_interval,
        }
    }

    fn transition(
        &self,
        action: &'static str,
        to: ControlState,
        allowed: impl FnOnce(ControlState) -> bool,
    ) -> Result<(), ControlError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|state| {
            if allowed(*state) {
                *state = to;
                true
            } else {
                result = Err(ControlError::InvalidTransition {
                    from: *state,
                    action,
                });
                false
            }
        });
        result
    }
}

/// Job-side view of a [`RunController`].
#[derive(Debug)]
pub struct RunGate {
    rx: watch::Receiver<ControlState>,
    poll_interval: Duration,
}

impl RunGate {
    pub fn state(&self) -> ControlState {
        *self.rx.borrow()
    }

    /// Return once the job is running, or cancelled.
    pub async fn wait_runnable(&mut self) -> Gate {
        loop {
            let state = *self.rx.borrow_and_update();
            match state {
                ControlState::Running => return Gate::Proceed,
                ControlState::Cancelled => return Gate::Cancelled,
                ControlState::Paused => {
                    tokio::select! {
                        changed = self.rx.changed() => {
                            // controller gone while paused: nobody can resume
                            if changed.is_err() {
                                return Gate::Cancelled;
                            }
                        }
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
    }

    /// Sleep for `duration`, returning early only on cancellation.
    ///
    /// Pausing neither shortens nor extends the sleep; the caller checks
    /// [`wait_runnable`](Self::wait_runnable) afterwards.
    pub async fn sleep(&mut self, duration: Duration) -> Gate {
        let now = Instant::now();
        let deadline = now.checked_add(duration).unwrap_or_else(|| far_future(now));
        loop {
            if *self.rx.borrow_and_update() == ControlState::Cancelled {
                return Gate::Cancelled;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Gate::Proceed,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep_until(deadline).await;
                        return Gate::Proceed;
                    }
                }
            }
        }
    }
}

/// Deadline for waits too long to represent: roughly 30 years out.
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86_400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let control = RunController::new();
        assert_eq!(control.state(), ControlState::Running);

        control.pause().unwrap();
        assert_eq!(control.state(), ControlState::Paused);
        control.resume().unwrap();
        assert_eq!(control.state(), ControlState::Running);
        control.cancel().unwrap();
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let control = RunController::new();
        assert_eq!(
            control.resume(),
            Err(ControlError::InvalidTransition {
                from: ControlState::Running,
                action: "resume"
            })
        );

        control.pause().unwrap();
        assert!(control.pause().is_err());

        control.cancel().unwrap();
        assert!(control.resume().is_err());
        assert!(control.pause().is_err());
        assert!(control.cancel().is_err());
        assert_eq!(control.state(), ControlState::Cancelled);
    }

    #[test]
    fn test_clones_share_state() {
        let control = RunController::new();
        let other = control.clone();
        other.pause().unwrap();
        assert_eq!(control.state(), ControlState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_waits_while_paused_until_resumed() {
        let control = RunController::new();
        let mut gate = control.gate(Duration::from_millis(500));
        control.pause().unwrap();

        let resumer = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            resumer.resume().unwrap();
        });

        let start = Instant::now();
        assert_eq!(gate.wait_runnable().await, Gate::Proceed);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_paused_releases_gate() {
        let control = RunController::new();
        let mut gate = control.gate(Duration::from_millis(500));
        control.pause().unwrap();

        let canceller = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel().unwrap();
        });

        let start = Instant::now();
        assert_eq!(gate.wait_runnable().await, Gate::Cancelled);
        assert!(start.elapsed() <= Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancel() {
        let control = RunController::new();
        let mut gate = control.gate(Duration::from_millis(500));

        let canceller = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel().unwrap();
        });

        let start = Instant::now();
        assert_eq!(gate.sleep(Duration::from_secs(60)).await, Gate::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_sleep_still_cancellable() {
        let control = RunController::new();
        let mut gate = control.gate(Duration::from_millis(500));

        let canceller = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel().unwrap();
        });

        assert_eq!(gate.sleep(Duration::MAX).await, Gate::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_not_shortened_by_pause() {
        let control = RunController::new();
        let mut gate = control.gate(Duration::from_millis(500));

        let pauser = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            pauser.pause().unwrap();
        });

        let start = Instant::now();
        assert_eq!(gate.sleep(Duration::from_secs(4)).await, Gate::Proceed);
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert_eq!(gate.state(), ControlState::Paused);
    }
}
