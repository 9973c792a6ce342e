//! Pre-flight detection of placeholder parameter values.
//!
//! Sample configurations ship with sentinel values such as `subnet-12345678`.
//! Deploying them fails late and noisily on the provider side, so they are
//! caught here and the operator is asked whether to go on anyway.

use std::fmt;
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::error::{Result, ValidationError};
use crate::stack::ParameterSet;

use super::spec::PlaceholderConfig;

/// Built-in sentinel values, as `(parameter, value)` pairs.
pub const DEFAULT_PLACEHOLDERS: &[(&str, &str)] = &[
    ("SubnetId", "subnet-12345678"),
    ("VpcId", "vpc-12345678"),
    ("KeyName", "my-demo-key"),
];

/// A parameter that still holds its sentinel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderWarning {
    /// Parameter name.
    pub key: String,
    /// The sentinel value found.
    pub value: String,
}

impl fmt::Display for PlaceholderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is still set to placeholder value {}", self.key, self.value)
    }
}

/// Decides whether to continue despite placeholder warnings.
pub trait Confirmer {
    /// Returns true to proceed with the deployment.
    fn confirm(&mut self, warnings: &[PlaceholderWarning]) -> bool;
}

/// Always proceeds. Used for `--yes` and non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, warnings: &[PlaceholderWarning]) -> bool {
        info!(
            "Proceeding despite {} placeholder value(s) (auto-confirmed)",
            warnings.len()
        );
        true
    }
}

/// Asks on a terminal. Only an explicit `y` or `yes` proceeds.
#[derive(Debug)]
pub struct PromptConfirmer<R, W> {
    input: R,
    output: W,
}

impl PromptConfirmer<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompts on stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptConfirmer<R, W> {
    /// Creates a confirmer over arbitrary streams.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, warnings: &[PlaceholderWarning]) -> std::io::Result<bool> {
        writeln!(self.output, "Warning: placeholder parameter values detected:")?;
        for warning in warnings {
            writeln!(self.output, "  - {warning}")?;
        }
        write!(self.output, "Do you want to continue anyway? (y/N): ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl<R: BufRead, W: Write> Confirmer for PromptConfirmer<R, W> {
    fn confirm(&mut self, warnings: &[PlaceholderWarning]) -> bool {
        self.ask(warnings).unwrap_or_else(|e| {
            warn!("Could not read confirmation: {e}");
            false
        })
    }
}

/// Flags parameters that still hold sentinel values.
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    placeholders: Vec<(String, String)>,
}

impl Default for ParameterValidator {
    fn default() -> Self {
        Self {
            placeholders: DEFAULT_PLACEHOLDERS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

impl ParameterValidator {
    /// Creates a validator with the built-in sentinels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds sentinels on top of the built-in ones.
    #[must_use]
    pub fn with_placeholders(mut self, extra: &[PlaceholderConfig]) -> Self {
        self.placeholders
            .extend(extra.iter().map(|p| (p.key.clone(), p.value.clone())));
        self
    }

    /// Lists parameters equal to a sentinel (exact, case-sensitive match).
    #[must_use]
    pub fn inspect(&self, parameters: &ParameterSet) -> Vec<PlaceholderWarning> {
        self.placeholders
            .iter()
            .filter(|(key, sentinel)| parameters.get(key) == Some(sentinel.as_str()))
            .map(|(key, value)| PlaceholderWarning {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Inspects parameters and asks the confirmer when placeholders are found.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PlaceholdersDeclined`] if the confirmer declines.
    pub fn check(&self, parameters: &ParameterSet, confirmer: &mut dyn Confirmer) -> Result<()> {
        let warnings = self.inspect(parameters);
        if warnings.is_empty() {
            return Ok(());
        }

        for warning in &warnings {
            warn!("{warning}");
        }

        if confirmer.confirm(&warnings) {
            Ok(())
        } else {
            Err(ValidationError::PlaceholdersDeclined {
                count: warnings.len(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackDeployError;

    struct Decline;

    impl Confirmer for Decline {
        fn confirm(&mut self, _warnings: &[PlaceholderWarning]) -> bool {
            false
        }
    }

    struct Counting(usize);

    impl Confirmer for Counting {
        fn confirm(&mut self, _warnings: &[PlaceholderWarning]) -> bool {
            self.0 += 1;
            true
        }
    }

    #[test]
    fn test_detects_default_sentinels() {
        let params: ParameterSet = [
            ("SubnetId", "subnet-12345678"),
            ("VpcId", "vpc-0abc"),
            ("KeyName", "my-demo-key"),
        ]
        .into_iter()
        .collect();

        let warnings = ParameterValidator::new().inspect(&params);
        let keys: Vec<_> = warnings.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, ["SubnetId", "KeyName"]);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let params: ParameterSet = [("SubnetId", "SUBNET-12345678")].into_iter().collect();
        assert!(ParameterValidator::new().inspect(&params).is_empty());
    }

    #[test]
    fn test_clean_parameters_skip_confirmation() {
        let params: ParameterSet = [("SubnetId", "subnet-0f00")].into_iter().collect();
        let mut confirmer = Counting(0);
        ParameterValidator::new()
            .check(&params, &mut confirmer)
            .expect("clean");
        assert_eq!(confirmer.0, 0);
    }

    #[test]
    fn test_declined_confirmation() {
        let params: ParameterSet = [("VpcId", "vpc-12345678")].into_iter().collect();
        let err = ParameterValidator::new()
            .check(&params, &mut Decline)
            .expect_err("declined");
        assert!(matches!(
            err,
            StackDeployError::Validation(ValidationError::PlaceholdersDeclined { count: 1 })
        ));
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_custom_placeholders() {
        let params: ParameterSet = [("CertificateArn", "changeme")].into_iter().collect();
        let validator = ParameterValidator::new().with_placeholders(&[PlaceholderConfig {
            key: String::from("CertificateArn"),
            value: String::from("changeme"),
        }]);
        assert_eq!(validator.inspect(&params).len(), 1);
        assert!(validator.check(&params, &mut AutoConfirm).is_ok());
    }

    #[test]
    fn test_prompt_accepts_yes_only() {
        let warnings = vec![PlaceholderWarning {
            key: String::from("KeyName"),
            value: String::from("my-demo-key"),
        }];

        let mut out = Vec::new();
        let mut yes = PromptConfirmer::new(&b"Yes\n"[..], &mut out);
        assert!(yes.confirm(&warnings));

        let mut out = Vec::new();
        let mut empty = PromptConfirmer::new(&b"\n"[..], &mut out);
        assert!(!empty.confirm(&warnings));
        let prompt = String::from_utf8(out).expect("utf8");
        assert!(prompt.contains("KeyName is still set to placeholder value my-demo-key"));
    }
}
