//! AWS `CloudFormation` stack provider.
//!
//! This module adapts the AWS SDK to the [`StackProvider`] trait. All provider
//! error strings are classified here, once, into [`ProviderErrorKind`]s.

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter, Tag};
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::error::{ProviderError, ProviderErrorKind};

use super::provider::{ProviderResult, StackProvider};
use super::types::{
    DeploymentRequest, OperationHandle, StackDescription, StackEvent, StackOutput, StackState,
};

/// Message fragment returned when a stack is missing.
const NOT_FOUND_FRAGMENT: &str = "does not exist";

/// Message fragment returned when an update changes nothing.
const NO_UPDATES_FRAGMENT: &str = "No updates are to be performed";

/// Message fragment returned when another operation holds the stack.
const BUSY_FRAGMENT: &str = "state and can not be";

/// Calls whose "does not exist" errors refer to the stack itself.
const STACK_LOOKUP_OPERATIONS: &[&str] = &["DescribeStacks", "DescribeStackEvents"];

/// Error codes that always mean a conflicting operation.
const CONFLICT_CODES: &[&str] = &["AlreadyExistsException", "TokenAlreadyExistsException"];

/// Parameter key fragments whose values are never logged.
const SECRET_KEY_FRAGMENTS: &[&str] = &["password", "secret", "token"];

/// `CloudFormation`-backed stack provider.
#[derive(Debug, Clone)]
pub struct CloudFormationProvider {
    /// SDK client.
    client: Client,
}

impl CloudFormationProvider {
    /// Creates a provider from the default AWS configuration chain.
    pub async fn new(region: Option<&str>) -> Self {
        let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        let config = match region {
            Some(region) => {
                loader
                    .region(aws_config::Region::new(region.to_string()))
                    .load()
                    .await
            }
            None => loader.load().await,
        };

        info!(
            "Using CloudFormation in region {}",
            config.region().map_or("<default>", |r| r.as_ref())
        );

        Self {
            client: Client::new(&config),
        }
    }

    /// Builds SDK parameters, redacting secret-looking values in trace logs.
    fn build_parameters(request: &DeploymentRequest) -> Vec<Parameter> {
        request
            .parameters
            .iter()
            .map(|(key, value)| {
                trace!("Parameter {} = {}", key, redact(key, value));
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect()
    }

    /// Builds SDK tags.
    fn build_tags(
        request: &DeploymentRequest,
        operation: &'static str,
    ) -> ProviderResult<Vec<Tag>> {
        request
            .tags
            .iter()
            .map(|(key, value)| {
                // `Tag::build()` is infallible in this SDK version.
                let _ = operation;
                Ok(Tag::builder().key(key).value(value).build())
            })
            .collect()
    }

    /// Builds SDK capabilities. `None` when nothing was requested.
    fn build_capabilities(request: &DeploymentRequest) -> Option<Vec<Capability>> {
        if request.capabilities.is_empty() {
            return None;
        }
        Some(
            request
                .capabilities
                .iter()
                .map(|c| Capability::from(c.as_str()))
                .collect(),
        )
    }
}

/// Generates a fresh client request token.
fn request_token() -> String {
    format!("halldyll-{}", Uuid::new_v4())
}

/// Hides values of secret-looking parameters.
fn redact<'a>(key: &str, value: &'a str) -> &'a str {
    let lower = key.to_lowercase();
    if SECRET_KEY_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        "[REDACTED]"
    } else {
        value
    }
}

/// Classifies a provider failure from the failing call, its code, and message.
///
/// "does not exist" only means a missing stack on lookup calls. On submissions
/// it names a missing parameter, key pair, or other input.
#[must_use]
pub fn classify_error(operation: &str, code: Option<&str>, message: &str) -> ProviderErrorKind {
    if STACK_LOOKUP_OPERATIONS.contains(&operation) && message.contains(NOT_FOUND_FRAGMENT) {
        ProviderErrorKind::NotFound
    } else if message.contains(NO_UPDATES_FRAGMENT) {
        ProviderErrorKind::NoOp
    } else if code.is_some_and(|c| CONFLICT_CODES.contains(&c))
        || message.contains(BUSY_FRAGMENT)
    {
        ProviderErrorKind::Conflict
    } else {
        ProviderErrorKind::Other
    }
}

/// Converts an SDK error into a classified [`ProviderError`].
fn provider_error<E>(operation: &'static str, err: &SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_string);
    let kind = classify_error(operation, code.as_deref(), &message);

    debug!("{operation} failed: kind={kind}, code={code:?}, message={message}");

    let error = ProviderError::new(kind, operation, message);
    match code {
        Some(code) => error.with_code(code),
        None => error,
    }
}

/// Converts an SDK timestamp.
fn to_chrono(timestamp: Option<&aws_sdk_cloudformation::primitives::DateTime>) -> DateTime<Utc> {
    timestamp
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl StackProvider for CloudFormationProvider {
    async fn describe_stack(&self, name: &str) -> ProviderResult<StackDescription> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| provider_error("DescribeStacks", &e))?;

        let stack = response
            .stacks()
            .first()
            .ok_or_else(|| ProviderError::not_found("DescribeStacks", name))?;

        let state = stack
            .stack_status()
            .map_or_else(|| StackState::Other(String::from("UNKNOWN")), |s| {
                StackState::from_status(s.as_str())
            });

        let outputs = stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some(StackOutput {
                    key: o.output_key()?.to_string(),
                    value: o.output_value().unwrap_or_default().to_string(),
                    description: o.description().map(str::to_string),
                })
            })
            .collect();

        Ok(StackDescription {
            name: name.to_string(),
            stack_id: stack.stack_id().map(str::to_string),
            state,
            status_reason: stack.stack_status_reason().map(str::to_string),
            outputs,
        })
    }

    async fn create_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        let token = request_token();
        let tags = Self::build_tags(request, "CreateStack")?;

        let response = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(Self::build_parameters(request)))
            .set_tags(Some(tags))
            .set_capabilities(Self::build_capabilities(request))
            .set_role_arn(request.role_arn.clone())
            .client_request_token(&token)
            .send()
            .await
            .map_err(|e| provider_error("CreateStack", &e))?;

        Ok(OperationHandle {
            stack_id: response
                .stack_id()
                .unwrap_or(&request.stack_name)
                .to_string(),
            request_token: Some(token),
        })
    }

    async fn update_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        let token = request_token();
        let tags = Self::build_tags(request, "UpdateStack")?;

        let response = self
            .client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(Self::build_parameters(request)))
            .set_tags(Some(tags))
            .set_capabilities(Self::build_capabilities(request))
            .set_role_arn(request.role_arn.clone())
            .client_request_token(&token)
            .send()
            .await
            .map_err(|e| provider_error("UpdateStack", &e))?;

        Ok(OperationHandle {
            stack_id: response
                .stack_id()
                .unwrap_or(&request.stack_name)
                .to_string(),
            request_token: Some(token),
        })
    }

    async fn delete_stack(&self, name: &str) -> ProviderResult<OperationHandle> {
        let token = request_token();

        self.client
            .delete_stack()
            .stack_name(name)
            .client_request_token(&token)
            .send()
            .await
            .map_err(|e| provider_error("DeleteStack", &e))?;

        Ok(OperationHandle {
            stack_id: name.to_string(),
            request_token: Some(token),
        })
    }

    async fn list_events(&self, name: &str) -> ProviderResult<Vec<StackEvent>> {
        let response = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| provider_error("DescribeStackEvents", &e))?;

        Ok(response
            .stack_events()
            .iter()
            .map(|e| StackEvent {
                timestamp: to_chrono(e.timestamp()),
                logical_resource_id: e.logical_resource_id().unwrap_or_default().to_string(),
                status: e
                    .resource_status()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
                reason: e.resource_status_reason().map(str::to_string),
            })
            .collect())
    }

    async fn get_outputs(&self, name: &str) -> ProviderResult<Vec<StackOutput>> {
        Ok(self.describe_stack(name).await?.outputs)
    }

    async fn validate_template(&self, template_body: &str) -> ProviderResult<()> {
        self.client
            .validate_template()
            .template_body(template_body)
            .send()
            .await
            .map_err(|e| provider_error("ValidateTemplate", &e))?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudformation"
    }
}
