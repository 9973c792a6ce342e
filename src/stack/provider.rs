//! Stack provider trait definition.
//!
//! This module defines the capability set the orchestrator consumes. Concrete
//! providers classify their failures into [`ProviderError`] kinds so nothing
//! above this seam inspects raw provider messages.

use async_trait::async_trait;

use crate::error::ProviderError;

use super::types::{DeploymentRequest, OperationHandle, StackDescription, StackEvent, StackOutput};

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Trait for stack providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackProvider: Send + Sync {
    /// Describes a stack.
    ///
    /// A missing stack is reported as a [`ProviderError`] of kind `NotFound`.
    async fn describe_stack(&self, name: &str) -> ProviderResult<StackDescription>;

    /// Submits a create operation.
    async fn create_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle>;

    /// Submits an update operation.
    ///
    /// An update with nothing to change is reported as a [`ProviderError`] of kind `NoOp`.
    async fn update_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle>;

    /// Submits a delete operation.
    async fn delete_stack(&self, name: &str) -> ProviderResult<OperationHandle>;

    /// Lists stack events, most recent first.
    async fn list_events(&self, name: &str) -> ProviderResult<Vec<StackEvent>>;

    /// Returns the declared outputs of a stack.
    async fn get_outputs(&self, name: &str) -> ProviderResult<Vec<StackOutput>>;

    /// Asks the provider to validate a template body.
    async fn validate_template(&self, template_body: &str) -> ProviderResult<()>;

    /// Short name of the provider, used in logs.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl StackProvider for Box<dyn StackProvider> {
    async fn describe_stack(&self, name: &str) -> ProviderResult<StackDescription> {
        (**self).describe_stack(name).await
    }

    async fn create_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        (**self).create_stack(request).await
    }

    async fn update_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        (**self).update_stack(request).await
    }

    async fn delete_stack(&self, name: &str) -> ProviderResult<OperationHandle> {
        (**self).delete_stack(name).await
    }

    async fn list_events(&self, name: &str) -> ProviderResult<Vec<StackEvent>> {
        (**self).list_events(name).await
    }

    async fn get_outputs(&self, name: &str) -> ProviderResult<Vec<StackOutput>> {
        (**self).get_outputs(name).await
    }

    async fn validate_template(&self, template_body: &str) -> ProviderResult<()> {
        (**self).validate_template(template_body).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
