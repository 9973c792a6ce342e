//! Create-or-update submission.
//!
//! The submitter routes a request to `create_stack` or `update_stack` based on
//! the existence probe and turns the provider's "nothing to update" answer
//! into a successful no-op instead of an error.

use tracing::{info, warn};

use crate::error::Result;

use super::probe::StackPresence;
use super::provider::StackProvider;
use super::types::{DeploymentRequest, OperationHandle, OperationKind};

/// Immediate outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The provider accepted the operation; it must be polled.
    Accepted {
        /// Operation that was submitted.
        operation: OperationKind,
        /// Provider handle.
        handle: OperationHandle,
    },
    /// The update would change nothing; no polling required.
    NoChanges,
}

/// Submits create or update operations.
#[derive(Debug)]
pub struct OperationSubmitter<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
}

impl<'a, P: StackProvider + ?Sized> OperationSubmitter<'a, P> {
    /// Creates a new submitter.
    #[must_use]
    pub const fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Submits the request as a create (absent stack) or update (existing stack).
    ///
    /// # Errors
    ///
    /// Returns a provider error for any rejection other than "no updates".
    pub async fn submit(
        &self,
        request: &DeploymentRequest,
        presence: &StackPresence,
    ) -> Result<SubmissionOutcome> {
        let operation = if presence.exists() {
            OperationKind::Update
        } else {
            OperationKind::Create
        };

        info!(
            "Submitting {operation} for stack {} ({} parameters, {} tags, {} capabilities, template {} bytes)",
            request.stack_name,
            request.parameters.len(),
            request.tags.len(),
            request.capabilities.len(),
            request.template_body.len()
        );

        let submitted = match operation {
            OperationKind::Update => self.provider.update_stack(request).await,
            _ => self.provider.create_stack(request).await,
        };

        match submitted {
            Ok(handle) => {
                info!("Stack {operation} accepted: {}", handle.stack_id);
                Ok(SubmissionOutcome::Accepted { operation, handle })
            }
            Err(err) if operation == OperationKind::Update && err.is_no_op() => {
                info!("No updates are to be performed on stack {}", request.stack_name);
                Ok(SubmissionOutcome::NoChanges)
            }
            Err(err) => {
                warn!("Stack {operation} rejected: {err}");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorKind, StackDeployError};
    use crate::stack::provider::MockStackProvider;
    use crate::stack::types::{StackDescription, StackState};

    fn request() -> DeploymentRequest {
        DeploymentRequest::new("demo", "Resources: {}").with_parameter("InstanceType", "t3.micro")
    }

    fn existing() -> StackPresence {
        StackPresence::Exists(StackDescription {
            name: String::from("demo"),
            stack_id: None,
            state: StackState::CreateComplete,
            status_reason: None,
            outputs: vec![],
        })
    }

    fn handle() -> OperationHandle {
        OperationHandle {
            stack_id: String::from("arn:demo"),
            request_token: None,
        }
    }

    #[tokio::test]
    async fn test_absent_stack_routes_to_create() {
        let mut provider = MockStackProvider::new();
        provider.expect_create_stack().times(1).returning(|_| Ok(handle()));
        provider.expect_update_stack().never();

        let outcome = OperationSubmitter::new(&provider)
            .submit(&request(), &StackPresence::NotFound)
            .await
            .expect("submission should succeed");

        assert_eq!(
            outcome,
            SubmissionOutcome::Accepted {
                operation: OperationKind::Create,
                handle: handle(),
            }
        );
    }

    #[tokio::test]
    async fn test_existing_stack_routes_to_update() {
        let mut provider = MockStackProvider::new();
        provider.expect_update_stack().times(1).returning(|_| Ok(handle()));
        provider.expect_create_stack().never();

        let outcome = OperationSubmitter::new(&provider)
            .submit(&request(), &existing())
            .await
            .expect("submission should succeed");

        assert!(matches!(
            outcome,
            SubmissionOutcome::Accepted {
                operation: OperationKind::Update,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_updates_is_success() {
        let mut provider = MockStackProvider::new();
        provider.expect_update_stack().times(1).returning(|_| {
            Err(ProviderError::new(
                ProviderErrorKind::NoOp,
                "UpdateStack",
                "No updates are to be performed.",
            ))
        });

        let outcome = OperationSubmitter::new(&provider)
            .submit(&request(), &existing())
            .await
            .expect("no-op should not be an error");

        assert_eq!(outcome, SubmissionOutcome::NoChanges);
    }

    #[tokio::test]
    async fn test_conflict_is_fatal() {
        let mut provider = MockStackProvider::new();
        provider.expect_update_stack().times(1).returning(|_| {
            Err(ProviderError::new(
                ProviderErrorKind::Conflict,
                "UpdateStack",
                "Stack demo is in UPDATE_IN_PROGRESS state and can not be updated.",
            ))
        });

        let err = OperationSubmitter::new(&provider)
            .submit(&request(), &existing())
            .await
            .expect_err("conflict should fail");

        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Conflict));
        assert!(matches!(err, StackDeployError::Provider(_)));
    }
}
