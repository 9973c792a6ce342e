//! Configuration specification types for the stack deployment system.
//!
//! This module defines the structs that map to the `halldyll.stack.yaml` file.
//! A configuration fully describes one stack: its template, parameters, tags,
//! and the cadence used to observe its operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::stack::{DeploymentRequest, ParameterSet};

/// The root configuration structure for a Halldyll stack deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackDeployConfig {
    /// Stack-level configuration.
    pub stack: StackConfig,
    /// Template parameters, in declaration order.
    #[serde(default)]
    pub parameters: ParameterSet,
    /// Tags applied to the stack.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Polling cadence and bound.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Failure diagnostics settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Additional placeholder sentinels checked before deploying.
    #[serde(default)]
    pub placeholders: Vec<PlaceholderConfig>,
}

/// Stack identity and template location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackConfig {
    /// Stack name, unique per account and region.
    pub name: String,
    /// Provider region (uses the default provider chain if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Template path, relative to the configuration file.
    pub template: String,
    /// Capability acknowledgements (e.g. `CAPABILITY_IAM`).
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Optional service role the provider assumes.
    #[serde(default)]
    pub role_arn: Option<String>,
}

/// Polling configuration for stack operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    /// Seconds between status queries.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Seconds between progress log lines.
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
    /// Wall-clock bound on polling in seconds. `0` disables the bound.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Failure diagnostics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Maximum number of non-failure events shown.
    #[serde(default = "default_event_limit")]
    pub event_limit: usize,
}

/// A parameter value that must be replaced before deploying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceholderConfig {
    /// Parameter name.
    pub key: String,
    /// Sentinel value.
    pub value: String,
}

const fn default_interval() -> u64 {
    5
}

const fn default_status_interval() -> u64 {
    10
}

const fn default_timeout() -> u64 {
    3600
}

const fn default_event_limit() -> usize {
    crate::stack::DEFAULT_EVENT_LIMIT
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            status_interval_secs: default_status_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl PollingConfig {
    /// Delay between status queries.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Minimum delay between progress log lines.
    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    /// Wall-clock bound, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    /// Overrides the wall-clock bound.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            event_limit: default_event_limit(),
        }
    }
}

impl StackDeployConfig {
    /// Builds the deployment request for this configuration.
    #[must_use]
    pub fn to_request(&self, template_body: impl Into<String>) -> DeploymentRequest {
        DeploymentRequest {
            stack_name: self.stack.name.clone(),
            template_body: template_body.into(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            capabilities: self.stack.capabilities.iter().cloned().collect(),
            role_arn: self.stack.role_arn.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_defaults() {
        let polling = PollingConfig::default();
        assert_eq!(polling.interval(), Duration::from_secs(5));
        assert_eq!(polling.status_interval(), Duration::from_secs(10));
        assert_eq!(polling.timeout(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let polling = PollingConfig::default().with_timeout_secs(0);
        assert_eq!(polling.timeout(), None);
    }

    #[test]
    fn test_to_request_copies_everything() {
        let config = StackDeployConfig {
            stack: StackConfig {
                name: String::from("demo"),
                region: Some(String::from("eu-west-1")),
                template: String::from("template.yaml"),
                capabilities: vec![String::from("CAPABILITY_IAM")],
                role_arn: None,
            },
            parameters: [("InstanceType", "t3.micro")].into_iter().collect(),
            tags: BTreeMap::from([(String::from("Project"), String::from("demo"))]),
            polling: PollingConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            placeholders: vec![],
        };

        let request = config.to_request("Resources: {}");
        assert_eq!(request.stack_name, "demo");
        assert_eq!(request.template_body, "Resources: {}");
        assert_eq!(request.parameters.get("InstanceType"), Some("t3.micro"));
        assert!(request.capabilities.contains("CAPABILITY_IAM"));
        assert_eq!(request.tags.len(), 1);
    }
}
