//! Configuration validation for stack configurations.
//!
//! Structural checks run before any provider call so that obviously broken
//! configurations never reach the remote side.

use crate::error::{ConfigError, Result, StackDeployError};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{DiagnosticsConfig, PollingConfig, StackConfig, StackDeployConfig};

/// Capability acknowledgements the provider accepts.
pub const KNOWN_CAPABILITIES: &[&str] = &[
    "CAPABILITY_IAM",
    "CAPABILITY_NAMED_IAM",
    "CAPABILITY_AUTO_EXPAND",
];

/// Maximum stack name length.
pub const MAX_STACK_NAME_LEN: usize = 128;

/// Validator for stack configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<FieldError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct FieldError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate(&self, config: &StackDeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_stack(&config.stack, &mut result);
        Self::validate_polling(&config.polling, &mut result);
        Self::validate_diagnostics(&config.diagnostics, &mut result);

        if config.tags.is_empty() {
            result
                .warnings
                .push(String::from("tags: No tags defined; the stack will be untagged"));
        }

        for (i, placeholder) in config.placeholders.iter().enumerate() {
            if placeholder.key.is_empty() {
                result.errors.push(FieldError {
                    field: format!("placeholders[{i}].key"),
                    message: String::from("Placeholder key cannot be empty"),
                });
            }
        }

        if let Some(first_error) = result.errors.first() {
            return Err(StackDeployError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )));
        }

        debug!(
            "Configuration validation passed with {} warnings",
            result.warnings.len()
        );
        Ok(result)
    }

    fn validate_stack(stack: &StackConfig, result: &mut ValidationResult) {
        if stack.name.is_empty() {
            result.errors.push(FieldError {
                field: String::from("stack.name"),
                message: String::from("Stack name cannot be empty"),
            });
        } else if !is_valid_stack_name(&stack.name) {
            result.errors.push(FieldError {
                field: String::from("stack.name"),
                message: format!(
                    "Stack name '{}' is invalid. Must start with a letter, contain only alphanumerics and hyphens, and be at most {MAX_STACK_NAME_LEN} characters.",
                    stack.name
                ),
            });
        }

        if stack.template.trim().is_empty() {
            result.errors.push(FieldError {
                field: String::from("stack.template"),
                message: String::from("Template path cannot be empty"),
            });
        }

        let mut seen = HashSet::new();
        for (i, capability) in stack.capabilities.iter().enumerate() {
            if !KNOWN_CAPABILITIES.contains(&capability.as_str()) {
                result.errors.push(FieldError {
                    field: format!("stack.capabilities[{i}]"),
                    message: format!(
                        "Unknown capability '{capability}'. Expected one of: {}",
                        KNOWN_CAPABILITIES.join(", ")
                    ),
                });
            }
            if !seen.insert(capability) {
                result.warnings.push(format!(
                    "stack.capabilities[{i}]: Duplicate capability '{capability}'"
                ));
            }
        }

        if let Some(role) = &stack.role_arn {
            if !role.starts_with("arn:") {
                result.errors.push(FieldError {
                    field: String::from("stack.role_arn"),
                    message: format!("Role '{role}' is not an ARN"),
                });
            }
        }
    }

    fn validate_polling(polling: &PollingConfig, result: &mut ValidationResult) {
        if polling.interval_secs == 0 {
            result.errors.push(FieldError {
                field: String::from("polling.interval_secs"),
                message: String::from("Poll interval must be at least 1 second"),
            });
        }

        if polling.status_interval_secs == 0 {
            result.errors.push(FieldError {
                field: String::from("polling.status_interval_secs"),
                message: String::from("Status interval must be at least 1 second"),
            });
        }

        if polling.timeout_secs != 0 && polling.timeout_secs < polling.interval_secs {
            result.errors.push(FieldError {
                field: String::from("polling.timeout_secs"),
                message: format!(
                    "Timeout ({}s) must not be shorter than the poll interval ({}s)",
                    polling.timeout_secs, polling.interval_secs
                ),
            });
        }
    }

    fn validate_diagnostics(diagnostics: &DiagnosticsConfig, result: &mut ValidationResult) {
        if diagnostics.event_limit == 0 {
            result.errors.push(FieldError {
                field: String::from("diagnostics.event_limit"),
                message: String::from("Event limit must be at least 1"),
            });
        }
    }
}

/// Checks a stack name: a letter followed by letters, digits, or hyphens.
fn is_valid_stack_name(name: &str) -> bool {
    if name.len() > MAX_STACK_NAME_LEN {
        return false;
    }

    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_config() -> StackDeployConfig {
        StackDeployConfig {
            stack: StackConfig {
                name: String::from("demo-stack"),
                region: None,
                template: String::from("template.yaml"),
                capabilities: vec![String::from("CAPABILITY_IAM")],
                role_arn: None,
            },
            parameters: crate::stack::ParameterSet::new(),
            tags: BTreeMap::from([(String::from("Project"), String::from("demo"))]),
            polling: PollingConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            placeholders: vec![],
        }
    }

    #[test]
    fn test_valid_config() {
        let result = ConfigValidator::new()
            .validate(&create_test_config())
            .expect("valid config");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_valid_stack_names() {
        assert!(is_valid_stack_name("demo"));
        assert!(is_valid_stack_name("Demo-Stack-2"));
        assert!(!is_valid_stack_name("2demo"));
        assert!(!is_valid_stack_name("demo_stack"));
        assert!(!is_valid_stack_name("-demo"));
        assert!(!is_valid_stack_name(&"a".repeat(129)));
        assert!(is_valid_stack_name(&"a".repeat(128)));
    }

    #[test]
    fn test_unknown_capability_rejected() {
        let mut config = create_test_config();
        config.stack.capabilities.push(String::from("CAPABILITY_EVERYTHING"));
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_timeout_shorter_than_interval_rejected() {
        let mut config = create_test_config();
        config.polling.interval_secs = 30;
        config.polling.timeout_secs = 10;
        let err = ConfigValidator::new()
            .validate(&config)
            .expect_err("timeout below interval");
        assert!(err.to_string().contains("Timeout"));
    }

    #[test]
    fn test_zero_event_limit_rejected() {
        let mut config = create_test_config();
        config.diagnostics.event_limit = 0;
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_warnings_for_untagged_and_duplicate_capabilities() {
        let mut config = create_test_config();
        config.tags.clear();
        config.stack.capabilities.push(String::from("CAPABILITY_IAM"));

        let result = ConfigValidator::new().validate(&config).expect("warnings only");
        assert_eq!(result.warnings.len(), 2);
    }
}
