//! CLI module for the Halldyll stack deployer.
//!
//! This module provides the command-line interface for deploying,
//! inspecting, and deleting stacks.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
