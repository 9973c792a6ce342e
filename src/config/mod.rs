//! Configuration module for the Halldyll stack deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `halldyll.stack.yaml`
//! - Structural validation of configuration values
//! - Pre-flight detection of placeholder parameter values
//! - Fingerprinting deployment requests

mod hash;
mod parser;
mod placeholders;
mod spec;
mod validator;

pub use hash::RequestHasher;
pub use parser::{CONFIG_ENV_VAR, ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use placeholders::{
    AutoConfirm, Confirmer, DEFAULT_PLACEHOLDERS, ParameterValidator, PlaceholderWarning,
    PromptConfirmer,
};
pub use spec::{DiagnosticsConfig, PlaceholderConfig, PollingConfig, StackConfig, StackDeployConfig};
pub use validator::{ConfigValidator, FieldError, KNOWN_CAPABILITIES, ValidationResult};
