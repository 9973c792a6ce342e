//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_ENV_VAR;

/// Halldyll Stacks - Declarative infrastructure stack deployer.
#[derive(Parser, Debug)]
#[command(name = "halldyll-stacks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log line format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stack project.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the stack configuration.
    Validate {
        /// Also ask the provider to validate the template.
        #[arg(long)]
        remote: bool,
    },

    /// Create or update the stack and wait for the result.
    Deploy {
        /// Continue without asking when placeholder values are found.
        #[arg(short, long)]
        yes: bool,

        /// Override the polling timeout in seconds (0 waits forever).
        #[arg(long)]
        timeout: Option<u64>,

        /// Return once the provider accepted the operation.
        #[arg(long)]
        no_wait: bool,
    },

    /// Delete the stack and wait until it is gone.
    Delete {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Override the polling timeout in seconds (0 waits forever).
        #[arg(long)]
        timeout: Option<u64>,

        /// Return once the provider accepted the deletion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the current stack status.
    Status,

    /// Show recent stack events, failures first in priority.
    Events {
        /// Maximum number of non-failure events to show.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the stack outputs.
    Outputs,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log line format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}
