//! Configuration parser for loading stack configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, and reading the template the configuration points at.

use crate::error::{ConfigError, Result, StackDeployError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::StackDeployConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "HALLDYLL_STACK_CONFIG";

/// Configuration parser for loading stack configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackDeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StackDeployError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackDeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a parameter key is repeated.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackDeployConfig> {
        debug!("Parsing YAML configuration");

        let config: StackDeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let message = e.to_string();
            if let Some(key) = duplicate_key(&message) {
                return StackDeployError::Config(ConfigError::DuplicateParameter { key });
            }
            StackDeployError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {message}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            "Parsed configuration for stack {} ({} parameters)",
            config.stack.name,
            config.parameters.len()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `HALLDYLL_STACK_NAME`, `HALLDYLL_STACK_REGION`,
    /// and `HALLDYLL_STACK_TEMPLATE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StackDeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    fn apply_env_overrides(config: &mut StackDeployConfig) {
        if let Ok(name) = std::env::var("HALLDYLL_STACK_NAME") {
            debug!("Overriding stack.name from environment");
            config.stack.name = name;
        }

        if let Ok(region) = std::env::var("HALLDYLL_STACK_REGION") {
            debug!("Overriding stack.region from environment");
            config.stack.region = Some(region);
        }

        if let Ok(template) = std::env::var("HALLDYLL_STACK_TEMPLATE") {
            debug!("Overriding stack.template from environment");
            config.stack.template = template;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackDeployError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads the template body referenced by the configuration.
    ///
    /// Relative template paths are resolved against the base path.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or is empty.
    pub fn load_template(&self, config: &StackDeployConfig) -> Result<String> {
        let template = Path::new(&config.stack.template);
        let path = match &self.base_path {
            Some(base) if template.is_relative() => base.join(template),
            _ => template.to_path_buf(),
        };

        let body = std::fs::read_to_string(&path).map_err(|e| {
            StackDeployError::Config(ConfigError::TemplateUnreadable {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;

        if body.trim().is_empty() {
            return Err(StackDeployError::Config(ConfigError::TemplateUnreadable {
                path,
                message: String::from("template is empty"),
            }));
        }

        debug!("Read template {} ({} bytes)", path.display(), body.len());
        Ok(body)
    }
}

/// Extracts the key from a duplicate-parameter deserialization message.
fn duplicate_key(message: &str) -> Option<String> {
    let rest = message.split("duplicate parameter key: ").nth(1)?;
    let key: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ',')
        .collect();
    (!key.is_empty()).then_some(key)
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "halldyll.stack.yaml",
    "halldyll.stack.yml",
    "stack.yaml",
    "stack.yml",
];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackDeployError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
