//! Stack existence probing.

use tracing::{debug, info};

use crate::error::Result;

use super::provider::StackProvider;
use super::types::StackDescription;

/// Whether a stack is present on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackPresence {
    /// No stack with this name exists.
    NotFound,
    /// The stack exists.
    Exists(StackDescription),
}

impl StackPresence {
    /// Returns true if the stack exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        matches!(self, Self::Exists(_))
    }
}

/// Probe that classifies a stack as present or absent.
#[derive(Debug)]
pub struct StackExistenceProbe<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
}

impl<'a, P: StackProvider + ?Sized> StackExistenceProbe<'a, P> {
    /// Creates a new probe.
    #[must_use]
    pub const fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Describes the stack once and classifies the answer.
    ///
    /// # Errors
    ///
    /// Returns a provider error for any failure other than a missing stack.
    pub async fn probe(&self, stack_name: &str) -> Result<StackPresence> {
        debug!("Checking if stack {stack_name} exists");

        match self.provider.describe_stack(stack_name).await {
            Ok(description) => {
                info!("Stack {stack_name} exists with status {}", description.state);
                Ok(StackPresence::Exists(description))
            }
            Err(err) if err.is_not_found() => {
                info!("Stack {stack_name} does not exist");
                Ok(StackPresence::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorKind, StackDeployError};
    use crate::stack::fake::FakeStackProvider;
    use crate::stack::types::StackState;

    #[tokio::test]
    async fn test_missing_stack_is_not_found() {
        let provider = FakeStackProvider::absent();
        let presence = StackExistenceProbe::new(&provider)
            .probe("demo")
            .await
            .expect("probe should succeed");
        assert_eq!(presence, StackPresence::NotFound);
        assert_eq!(provider.describe_calls(), 1);
    }

    #[tokio::test]
    async fn test_existing_stack_is_exists() {
        let provider = FakeStackProvider::existing(StackState::CreateComplete);
        let presence = StackExistenceProbe::new(&provider)
            .probe("demo")
            .await
            .expect("probe should succeed");
        assert!(presence.exists());
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let provider = FakeStackProvider::absent().with_describe_error(
            ProviderError::new(ProviderErrorKind::Other, "DescribeStacks", "Rate exceeded")
                .with_code("Throttling"),
        );
        let err = StackExistenceProbe::new(&provider)
            .probe("demo")
            .await
            .expect_err("probe should fail");
        assert!(matches!(err, StackDeployError::Provider(ref e) if e.message == "Rate exceeded"));
        assert_eq!(provider.describe_calls(), 1);
    }
}
