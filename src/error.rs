//! Error types for the Halldyll stack deployment system.
//!
//! This module provides the error hierarchy for every phase of a stack
//! deployment: configuration, pre-flight validation, provider calls, and
//! the observation of the remote operation.

use std::path::PathBuf;
use thiserror::Error;

use crate::stack::EventSummary;

/// The main error type for the Halldyll stack deployment system.
#[derive(Debug, Error)]
pub enum StackDeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pre-flight validation was not confirmed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Stack provider errors.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Errors observed while waiting on a stack operation.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The template file was not found or could not be read.
    #[error("Failed to read template {path}: {message}")]
    TemplateUnreadable {
        /// Path to the template.
        path: PathBuf,
        /// Description of the read failure.
        message: String,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Duplicate parameter key.
    #[error("Duplicate parameter key: {key}")]
    DuplicateParameter {
        /// The duplicated key.
        key: String,
    },
}

/// Pre-flight validation outcomes that stop a deployment on purpose.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Placeholder parameter values were detected and the operator declined to continue.
    #[error(
        "{count} parameter(s) still use placeholder values; update the configuration and run again"
    )]
    PlaceholdersDeclined {
        /// Number of placeholder warnings that were shown.
        count: usize,
    },
}

/// Classification of a provider failure, decided once at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The stack does not exist.
    NotFound,
    /// The update would not change anything.
    NoOp,
    /// Another operation is already running on the stack.
    Conflict,
    /// Any other failure (auth, throttling, malformed template, ...).
    Other,
}

/// A failure reported by the stack provider.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct ProviderError {
    /// Failure classification.
    pub kind: ProviderErrorKind,
    /// Provider operation that failed.
    pub operation: &'static str,
    /// Provider error code, when one was returned.
    pub code: Option<String>,
    /// Provider message, kept intact.
    pub message: String,
}

/// Errors raised while observing a submitted stack operation.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The stack reached a failed or rolled back state.
    #[error("Stack {stack} {operation} failed with status {status}")]
    StackOperationFailed {
        /// Stack name.
        stack: String,
        /// Operation that was being observed.
        operation: String,
        /// Status that ended the wait.
        status: String,
        /// Event summary gathered after the failure.
        diagnostics: Option<EventSummary>,
    },

    /// Polling exceeded its wall-clock bound.
    #[error("Timed out after {waited_secs}s waiting for stack {stack} {operation} (last status: {last_status})")]
    Timeout {
        /// Stack name.
        stack: String,
        /// Operation that was being observed.
        operation: String,
        /// Seconds spent polling.
        waited_secs: u64,
        /// Last observed status.
        last_status: String,
        /// Event summary gathered after the timeout.
        diagnostics: Option<EventSummary>,
    },

    /// Observation was cancelled; the remote operation keeps running.
    #[error("Stopped waiting for stack {stack} {operation}; the operation continues remotely")]
    Cancelled {
        /// Stack name.
        stack: String,
        /// Operation that was being observed.
        operation: String,
        /// Event summary gathered after cancelling.
        diagnostics: Option<EventSummary>,
    },
}

/// Result type alias for Halldyll stack operations.
pub type Result<T> = std::result::Result<T, StackDeployError>;

impl StackDeployError {
    /// Returns the provider error kind if this is a provider error.
    #[must_use]
    pub const fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Event summary gathered for a failed, timed out, or cancelled operation.
    #[must_use]
    pub const fn diagnostics(&self) -> Option<&EventSummary> {
        match self {
            Self::Deploy(err) => err.diagnostics(),
            _ => None,
        }
    }

    /// Process exit code for this error.
    ///
    /// A declined placeholder confirmation is a deliberate abort and exits cleanly.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 0,
            Self::Deploy(DeployError::Timeout { .. }) => 3,
            Self::Deploy(DeployError::Cancelled { .. }) => 130,
            _ => 1,
        }
    }
}

impl DeployError {
    /// Event summary attached to this error, if one could be fetched.
    #[must_use]
    pub const fn diagnostics(&self) -> Option<&EventSummary> {
        match self {
            Self::StackOperationFailed { diagnostics, .. }
            | Self::Timeout { diagnostics, .. }
            | Self::Cancelled { diagnostics, .. } => diagnostics.as_ref(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ProviderError {
    /// Creates a provider error.
    #[must_use]
    pub fn new(
        kind: ProviderErrorKind,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            operation,
            code: None,
            message: message.into(),
        }
    }

    /// Attaches the provider error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Creates a not-found error for the given stack.
    #[must_use]
    pub fn not_found(operation: &'static str, stack: &str) -> Self {
        Self::new(
            ProviderErrorKind::NotFound,
            operation,
            format!("Stack with id {stack} does not exist"),
        )
    }

    /// Returns true if the stack does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::NotFound)
    }

    /// Returns true if the provider reported nothing to update.
    #[must_use]
    pub const fn is_no_op(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::NoOp)
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::NoOp => "no changes",
            Self::Conflict => "conflict",
            Self::Other => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_validation_exits_cleanly() {
        let err = StackDeployError::from(ValidationError::PlaceholdersDeclined { count: 2 });
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_failures_exit_non_zero() {
        let failed = StackDeployError::from(DeployError::StackOperationFailed {
            stack: String::from("demo"),
            operation: String::from("update"),
            status: String::from("UPDATE_ROLLBACK_IN_PROGRESS"),
            diagnostics: None,
        });
        assert_eq!(failed.exit_code(), 1);

        let conflict = StackDeployError::from(ProviderError::new(
            ProviderErrorKind::Conflict,
            "UpdateStack",
            "Stack demo is in UPDATE_IN_PROGRESS state and can not be updated.",
        ));
        assert_eq!(conflict.exit_code(), 1);
        assert_eq!(conflict.provider_kind(), Some(ProviderErrorKind::Conflict));
    }

    #[test]
    fn test_provider_message_kept_intact() {
        let err =
            ProviderError::new(ProviderErrorKind::Other, "CreateStack", "Template format error")
                .with_code("ValidationError");
        let rendered = err.to_string();
        assert!(rendered.contains("Template format error"));
        assert!(rendered.contains("CreateStack"));
        assert_eq!(err.code.as_deref(), Some("ValidationError"));
    }
}
