//! Polling loop for submitted stack operations.
//!
//! The poller queries the stack status at a fixed interval until the status
//! is terminal for the observed operation, the wall-clock bound is exceeded,
//! or observation is cancelled. Status lines are logged on a slower cadence
//! than the queries so the log stays readable on long deployments.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::Result;

use super::provider::StackProvider;
use super::types::{FAILED_MARKER, OperationKind, StackState};

/// Receiver side of a cancellation flag. `true` means stop observing.
pub type CancelSignal = watch::Receiver<bool>;

/// State of the polling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Operation still running.
    Polling,
    /// Operation finished successfully.
    Succeeded,
    /// Operation failed or is rolling back.
    Failed,
}

/// How polling ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollTermination {
    /// Reached the operation's success state.
    Succeeded,
    /// Reached a failure or rollback state.
    Failed,
    /// Exceeded the configured wall-clock bound.
    TimedOut,
    /// Observation was cancelled.
    Cancelled,
}

/// Report of a finished polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Operation that was observed.
    pub operation: OperationKind,
    /// How polling ended.
    pub termination: PollTermination,
    /// Last observed status (`None` if cancelled before the first query).
    pub last_state: Option<StackState>,
    /// Number of status queries issued.
    pub polls: u32,
    /// Number of status lines logged.
    pub status_lines: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

impl PollReport {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.termination, PollTermination::Succeeded)
    }

    /// Last observed status as text.
    #[must_use]
    pub fn last_status(&self) -> String {
        self.last_state
            .as_ref()
            .map_or_else(|| String::from("UNKNOWN"), ToString::to_string)
    }
}

/// Classifies a status for the given operation.
#[must_use]
pub fn classify(operation: OperationKind, state: &StackState) -> PollState {
    if operation.is_success(state) {
        return PollState::Succeeded;
    }

    let failed = match operation {
        OperationKind::Delete => state.as_str().contains(FAILED_MARKER),
        OperationKind::Create | OperationKind::Update => {
            *state == StackState::NotFound || state.is_failure()
        }
    };

    if failed {
        PollState::Failed
    } else {
        PollState::Polling
    }
}

/// Poller driving a submitted operation to a terminal state.
pub struct OperationPoller<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
    /// Polling cadence and bound.
    settings: &'a PollingConfig,
    /// Optional cancellation flag.
    cancel: Option<CancelSignal>,
}

impl<'a, P: StackProvider + ?Sized> OperationPoller<'a, P> {
    /// Creates a new poller.
    #[must_use]
    pub const fn new(provider: &'a P, settings: &'a PollingConfig) -> Self {
        Self {
            provider,
            settings,
            cancel: None,
        }
    }

    /// Stops polling when the signal flips to `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Polls until the operation reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns a provider error if a status query fails for a reason other
    /// than the stack being absent.
    pub async fn wait(
        &mut self,
        stack_name: &str,
        operation: OperationKind,
    ) -> Result<PollReport> {
        info!("Waiting for stack {operation} to complete...");

        let interval = self.settings.interval();
        let status_interval = self.settings.status_interval();
        let timeout = self.settings.timeout();

        let started = Instant::now();
        let mut last_print: Option<Instant> = None;
        let mut last_state: Option<StackState> = None;
        let mut polls: u32 = 0;
        let mut status_lines: u32 = 0;

        loop {
            if self.is_cancelled() {
                let tally = Tally::new(polls, status_lines, started);
                return Ok(tally.finish(operation, PollTermination::Cancelled, last_state));
            }

            let state = match self.provider.describe_stack(stack_name).await {
                Ok(description) => description.state,
                Err(err) if err.is_not_found() => StackState::NotFound,
                Err(err) => return Err(err.into()),
            };
            polls = polls.saturating_add(1);

            let elapsed = started.elapsed();
            debug!("Poll #{polls} for stack {stack_name}: {state}");

            if last_print.is_none_or(|t| t.elapsed() >= status_interval) {
                info!("Stack status: {state} (elapsed {}s)", elapsed.as_secs());
                last_print = Some(Instant::now());
                status_lines = status_lines.saturating_add(1);
            }

            let tally = Tally::new(polls, status_lines, started);
            match classify(operation, &state) {
                PollState::Succeeded => {
                    info!("Stack {operation} completed successfully with status {state}");
                    return Ok(tally.finish(operation, PollTermination::Succeeded, Some(state)));
                }
                PollState::Failed => {
                    warn!("Stack {operation} failed with status {state}");
                    return Ok(tally.finish(operation, PollTermination::Failed, Some(state)));
                }
                PollState::Polling => {}
            }

            last_state = Some(state);

            if timeout.is_some_and(|limit| elapsed >= limit) {
                warn!(
                    "Timed out after {}s waiting for stack {operation}",
                    elapsed.as_secs()
                );
                return Ok(tally.finish(operation, PollTermination::TimedOut, last_state));
            }

            if self.sleep_or_cancel(interval).await {
                warn!("Cancellation requested, stopping observation of stack {stack_name}");
                return Ok(tally.finish(operation, PollTermination::Cancelled, last_state));
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleeps for `interval`. Returns true if cancelled meanwhile.
    async fn sleep_or_cancel(&mut self, interval: Duration) -> bool {
        let Some(rx) = self.cancel.as_mut() else {
            tokio::time::sleep(interval).await;
            return false;
        };

        tokio::select! {
            () = tokio::time::sleep(interval) => false,
            () = wait_for_cancel(rx) => true,
        }
    }
}

/// Counters carried into the final report.
#[derive(Debug, Clone, Copy)]
struct Tally {
    polls: u32,
    status_lines: u32,
    started: Instant,
}

impl Tally {
    const fn new(polls: u32, status_lines: u32, started: Instant) -> Self {
        Self {
            polls,
            status_lines,
            started,
        }
    }

    fn finish(
        self,
        operation: OperationKind,
        termination: PollTermination,
        last_state: Option<StackState>,
    ) -> PollReport {
        PollReport {
            operation,
            termination,
            last_state,
            polls: self.polls,
            status_lines: self.status_lines,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Resolves once the flag is `true`; never resolves if the sender is gone.
async fn wait_for_cancel(rx: &mut CancelSignal) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::fake::FakeStackProvider;
    use crate::stack::provider::StackProvider;

    fn settings() -> PollingConfig {
        PollingConfig {
            interval_secs: 5,
            status_interval_secs: 10,
            timeout_secs: 60,
        }
    }

    async fn submitted(provider: &FakeStackProvider) {
        provider
            .create_stack(&crate::stack::types::DeploymentRequest::new("demo", "{}"))
            .await
            .expect("create");
    }

    #[test]
    fn test_classification() {
        use OperationKind::{Create, Delete, Update};
        use StackState as S;

        let cases = [
            (Create, S::CreateInProgress, PollState::Polling),
            (Create, S::CreateComplete, PollState::Succeeded),
            (Create, S::RollbackInProgress, PollState::Failed),
            (Create, S::NotFound, PollState::Failed),
            (Update, S::UpdateCompleteCleanupInProgress, PollState::Polling),
            (Update, S::UpdateRollbackInProgress, PollState::Failed),
            (Update, S::CreateComplete, PollState::Polling),
            (Delete, S::DeleteInProgress, PollState::Polling),
            (Delete, S::RollbackComplete, PollState::Polling),
            (Delete, S::DeleteFailed, PollState::Failed),
            (Delete, S::NotFound, PollState::Succeeded),
            (
                Update,
                S::Other(String::from("UPDATE_SOMETHING_NEW_IN_PROGRESS")),
                PollState::Polling,
            ),
        ];

        for (operation, state, expected) in cases {
            assert_eq!(classify(operation, &state), expected, "{operation} {state}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_poll() {
        let provider = FakeStackProvider::absent().with_script([
            StackState::CreateInProgress,
            StackState::CreateInProgress,
            StackState::CreateComplete,
        ]);
        submitted(&provider).await;

        let config = settings();
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Create)
            .await
            .expect("poll");

        assert_eq!(report.termination, PollTermination::Succeeded);
        assert_eq!(report.polls, 3);
        assert_eq!(provider.describe_calls_after_submit(), 3);
        assert_eq!(report.elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_rollback_marker() {
        let provider = FakeStackProvider::existing(StackState::UpdateComplete).with_script([
            StackState::UpdateInProgress,
            StackState::UpdateRollbackInProgress,
            StackState::UpdateRollbackComplete,
        ]);
        provider
            .update_stack(&crate::stack::types::DeploymentRequest::new("demo", "{}"))
            .await
            .expect("update");

        let config = settings();
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Update)
            .await
            .expect("poll");

        assert_eq!(report.termination, PollTermination::Failed);
        assert_eq!(report.last_state, Some(StackState::UpdateRollbackInProgress));
        assert_eq!(provider.describe_calls_after_submit(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let provider = FakeStackProvider::absent().with_script([StackState::CreateInProgress]);
        submitted(&provider).await;

        let config = PollingConfig {
            interval_secs: 5,
            status_interval_secs: 10,
            timeout_secs: 20,
        };
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Create)
            .await
            .expect("poll");

        assert_eq!(report.termination, PollTermination::TimedOut);
        assert_eq!(report.last_state, Some(StackState::CreateInProgress));
        // Queries at 0, 5, 10, 15 and 20 seconds.
        assert_eq!(report.polls, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_lines_follow_slower_cadence() {
        let provider = FakeStackProvider::absent().with_script([StackState::CreateInProgress]);
        submitted(&provider).await;

        let config = PollingConfig {
            interval_secs: 5,
            status_interval_secs: 10,
            timeout_secs: 30,
        };
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Create)
            .await
            .expect("poll");

        assert_eq!(report.termination, PollTermination::TimedOut);
        // Queried every 5s from 0 to 30s, logged at 0, 10, 20 and 30s.
        assert_eq!(report.polls, 7);
        assert_eq!(report.status_lines, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_observation_always_logged() {
        let provider = FakeStackProvider::absent().with_script([StackState::CreateComplete]);
        submitted(&provider).await;

        let config = PollingConfig {
            interval_secs: 5,
            status_interval_secs: 600,
            timeout_secs: 60,
        };
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Create)
            .await
            .expect("poll");

        assert!(report.succeeded());
        assert_eq!(report.polls, 1);
        assert_eq!(report.status_lines, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_observation() {
        let provider = FakeStackProvider::absent().with_script([StackState::CreateInProgress]);
        submitted(&provider).await;

        let (tx, rx) = watch::channel(false);
        let config = settings();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            let _ = tx.send(true);
        });

        let report = OperationPoller::new(&provider, &config)
            .with_cancellation(rx)
            .wait("demo", OperationKind::Create)
            .await
            .expect("poll");
        canceller.await.expect("canceller task");

        assert_eq!(report.termination, PollTermination::Cancelled);
        assert_eq!(report.polls, 2);
        assert_eq!(provider.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_for_absence() {
        let provider = FakeStackProvider::existing(StackState::CreateComplete).with_script([
            StackState::DeleteInProgress,
            StackState::DeleteInProgress,
            StackState::NotFound,
        ]);
        provider.delete_stack("demo").await.expect("delete");

        let config = settings();
        let report = OperationPoller::new(&provider, &config)
            .wait("demo", OperationKind::Delete)
            .await
            .expect("poll");

        assert!(report.succeeded());
        assert_eq!(report.last_state, Some(StackState::NotFound));
        assert_eq!(report.polls, 3);
    }
}
