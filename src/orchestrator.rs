//! Stack deployer driving one apply-and-observe run.
//!
//! The deployer strings the stack components together: placeholder checks,
//! existence probe, create-or-update submission, polling, and then either
//! output extraction on success or event diagnostics on anything else.
//! Deletion follows the same probe, submit, and poll shape.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{
    Confirmer, ParameterValidator, PollingConfig, RequestHasher, StackDeployConfig,
};
use crate::error::{DeployError, Result};
use crate::stack::{
    CancelSignal, DeploymentRequest, EventDiagnostics, OperationKind, OperationPoller,
    OperationSubmitter, OutputExtractor, PollReport, PollTermination, StackExistenceProbe,
    StackOutput, StackPresence, StackProvider, SubmissionOutcome,
};

/// Final outcome of a deploy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    /// The stack was created.
    Created,
    /// The stack was updated.
    Updated,
    /// The update would not change anything.
    NoChanges,
    /// The operation was accepted and not observed.
    Submitted,
}

/// Report of a deploy run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeployReport {
    /// Stack name.
    pub stack_name: String,
    /// Request fingerprint.
    pub fingerprint: String,
    /// What happened.
    pub outcome: DeployOutcome,
    /// Operation that was submitted.
    pub operation: OperationKind,
    /// Provider stack id, when an operation was accepted.
    pub stack_id: Option<String>,
    /// Last observed status.
    pub final_status: Option<String>,
    /// Stack outputs.
    pub outputs: Vec<StackOutput>,
    /// Number of status queries issued.
    pub polls: u32,
    /// Seconds spent polling.
    pub elapsed_secs: u64,
}

/// Final outcome of a delete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The stack is gone.
    Deleted,
    /// There was nothing to delete.
    AlreadyAbsent,
    /// The deletion was accepted and not observed.
    Submitted,
}

/// Report of a delete run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeleteReport {
    /// Stack name.
    pub stack_name: String,
    /// What happened.
    pub outcome: DeleteOutcome,
    /// Number of status queries issued.
    pub polls: u32,
    /// Seconds spent polling.
    pub elapsed_secs: u64,
}

/// Deployer for a single stack.
pub struct StackDeployer<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
    /// Polling cadence and bound.
    polling: PollingConfig,
    /// Non-failure events shown in diagnostics.
    event_limit: usize,
    /// Placeholder detection.
    validator: ParameterValidator,
    /// Request fingerprinting.
    hasher: RequestHasher,
    /// Stops observation when flipped.
    cancel: Option<CancelSignal>,
    /// Whether to wait for operations to finish.
    wait: bool,
}

impl<'a, P: StackProvider + ?Sized> StackDeployer<'a, P> {
    /// Creates a deployer using the polling, diagnostics, and placeholder
    /// settings of the given configuration.
    #[must_use]
    pub fn new(provider: &'a P, config: &StackDeployConfig) -> Self {
        Self {
            provider,
            polling: config.polling.clone(),
            event_limit: config.diagnostics.event_limit,
            validator: ParameterValidator::new().with_placeholders(&config.placeholders),
            hasher: RequestHasher::new(),
            cancel: None,
            wait: true,
        }
    }

    /// Overrides the polling settings.
    #[must_use]
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Stops observing when the signal flips to `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets whether to wait for accepted operations to finish.
    #[must_use]
    pub const fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Creates or updates the stack and observes the operation.
    ///
    /// # Errors
    ///
    /// Returns a validation error if placeholders are declined, a provider
    /// error if a call is rejected, or a deploy error if the operation fails,
    /// times out, or observation is cancelled.
    pub async fn deploy(
        &self,
        request: &DeploymentRequest,
        confirmer: &mut dyn Confirmer,
    ) -> Result<DeployReport> {
        let name = request.stack_name.as_str();
        let fingerprint = self.hasher.hash_request(request);
        info!(
            "Deploying stack {name} via {} (request {})",
            self.provider.provider_name(),
            self.hasher.short_hash(&fingerprint)
        );

        self.validator.check(&request.parameters, confirmer)?;

        let presence = StackExistenceProbe::new(self.provider).probe(name).await?;
        let planned = if presence.exists() {
            OperationKind::Update
        } else {
            OperationKind::Create
        };
        self.ensure_not_cancelled(name, planned)?;

        let outcome = OperationSubmitter::new(self.provider)
            .submit(request, &presence)
            .await?;

        let (operation, handle) = match outcome {
            SubmissionOutcome::NoChanges => {
                let (stack_id, final_status, outputs) = match presence {
                    StackPresence::Exists(description) => (
                        description.stack_id,
                        Some(description.state.to_string()),
                        description.outputs,
                    ),
                    StackPresence::NotFound => (None, None, Vec::new()),
                };
                return Ok(DeployReport {
                    stack_name: name.to_string(),
                    fingerprint,
                    outcome: DeployOutcome::NoChanges,
                    operation: OperationKind::Update,
                    stack_id,
                    final_status,
                    outputs,
                    polls: 0,
                    elapsed_secs: 0,
                });
            }
            SubmissionOutcome::Accepted { operation, handle } => (operation, handle),
        };

        if !self.wait {
            info!("Not waiting for stack {operation}; check progress with the status command");
            return Ok(DeployReport {
                stack_name: name.to_string(),
                fingerprint,
                outcome: DeployOutcome::Submitted,
                operation,
                stack_id: Some(handle.stack_id),
                final_status: None,
                outputs: Vec::new(),
                polls: 0,
                elapsed_secs: 0,
            });
        }

        let report = self.poller().wait(name, operation).await?;
        self.conclude(name, &report).await?;

        let outputs = OutputExtractor::new(self.provider).extract(name).await?;

        Ok(DeployReport {
            stack_name: name.to_string(),
            fingerprint,
            outcome: if operation == OperationKind::Create {
                DeployOutcome::Created
            } else {
                DeployOutcome::Updated
            },
            operation,
            stack_id: Some(handle.stack_id),
            final_status: report.last_state.as_ref().map(ToString::to_string),
            outputs,
            polls: report.polls,
            elapsed_secs: report.elapsed.as_secs(),
        })
    }

    /// Deletes the stack and waits until it is gone.
    ///
    /// # Errors
    ///
    /// Returns a provider error if a call is rejected, or a deploy error if
    /// the deletion fails, times out, or observation is cancelled.
    pub async fn destroy(&self, stack_name: &str) -> Result<DeleteReport> {
        info!("Deleting stack {stack_name}");

        let presence = StackExistenceProbe::new(self.provider)
            .probe(stack_name)
            .await?;
        if !presence.exists() {
            info!("Stack {stack_name} does not exist, nothing to delete");
            return Ok(delete_report(stack_name, DeleteOutcome::AlreadyAbsent, None));
        }

        self.ensure_not_cancelled(stack_name, OperationKind::Delete)?;
        self.provider.delete_stack(stack_name).await?;
        info!("Stack deletion initiated");

        if !self.wait {
            return Ok(delete_report(stack_name, DeleteOutcome::Submitted, None));
        }

        let report = self.poller().wait(stack_name, OperationKind::Delete).await?;
        self.conclude(stack_name, &report).await?;

        info!("Stack {stack_name} deleted successfully");
        Ok(delete_report(stack_name, DeleteOutcome::Deleted, Some(&report)))
    }

    /// Refuses to submit once cancellation was requested.
    fn ensure_not_cancelled(&self, stack_name: &str, operation: OperationKind) -> Result<()> {
        if !self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Ok(());
        }

        warn!("Cancellation requested, not submitting stack {operation} for {stack_name}");
        Err(DeployError::Cancelled {
            stack: stack_name.to_string(),
            operation: operation.to_string(),
            diagnostics: None,
        }
        .into())
    }

    fn poller(&self) -> OperationPoller<'_, P> {
        let poller = OperationPoller::new(self.provider, &self.polling);
        match &self.cancel {
            Some(cancel) => poller.with_cancellation(cancel.clone()),
            None => poller,
        }
    }

    /// Turns a non-successful poll into an error carrying event diagnostics.
    async fn conclude(&self, stack_name: &str, report: &PollReport) -> Result<()> {
        if report.succeeded() {
            return Ok(());
        }

        let diagnostics = EventDiagnostics::new(self.provider, self.event_limit)
            .collect(stack_name)
            .await;
        if let Some(summary) = &diagnostics {
            for line in &summary.lines {
                debug!("{line}");
            }
        }

        let stack = stack_name.to_string();
        let operation = report.operation.to_string();
        let err = match report.termination {
            PollTermination::TimedOut => DeployError::Timeout {
                stack,
                operation,
                waited_secs: report.elapsed.as_secs(),
                last_status: report.last_status(),
                diagnostics,
            },
            PollTermination::Cancelled => DeployError::Cancelled {
                stack,
                operation,
                diagnostics,
            },
            PollTermination::Failed | PollTermination::Succeeded => {
                DeployError::StackOperationFailed {
                    stack,
                    operation,
                    status: report.last_status(),
                    diagnostics,
                }
            }
        };

        error!("{err}");
        Err(err.into())
    }
}

fn delete_report(
    stack_name: &str,
    outcome: DeleteOutcome,
    poll: Option<&PollReport>,
) -> DeleteReport {
    DeleteReport {
        stack_name: stack_name.to_string(),
        outcome,
        polls: poll.map_or(0, |p| p.polls),
        elapsed_secs: poll.map_or(Duration::ZERO, |p| p.elapsed).as_secs(),
    }
}
