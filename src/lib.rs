// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests lean on expect() and panic!() for readable failures
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Halldyll Deploy Stacks
//!
//! A declarative deployment orchestrator for infrastructure stacks.
//!
//! ## Overview
//!
//! Halldyll takes a template plus a parameter and tag set and drives one
//! named stack to its desired state:
//!
//! - Detect placeholder parameter values before touching the provider
//! - Decide between create and update from the stack's current existence
//! - Treat "no updates are to be performed" as a successful no-op
//! - Poll the provider-side state machine to a terminal outcome
//! - Replay the stack's event history, failures first, when things go wrong
//! - Print the stack outputs when they go right
//!
//! ## Architecture
//!
//! ```text
//! ParameterValidator -> StackExistenceProbe -> OperationSubmitter
//!     -> OperationPoller -> EventDiagnostics | OutputExtractor
//! ```
//!
//! The [`orchestrator::StackDeployer`] strings these together; the
//! [`stack::StackProvider`] trait is the only seam to the remote side.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation, and placeholder checks
//! - [`stack`]: Provider abstraction, `CloudFormation` adapter, stack components
//! - [`orchestrator`]: Deploy and delete flows
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! stack:
//!   name: halldyll-network
//!   region: eu-west-1
//!   template: template.yaml
//!   capabilities: [CAPABILITY_IAM]
//!
//! parameters:
//!   VpcId: vpc-0a1b2c3d
//!   SubnetId: subnet-0a1b2c3d
//!
//! tags:
//!   Project: halldyll
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod stack;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{
    AutoConfirm, Confirmer, ConfigParser, ConfigValidator, ParameterValidator, PollingConfig,
    PromptConfirmer, RequestHasher, StackDeployConfig,
};
pub use error::{Result, StackDeployError};
pub use orchestrator::{DeleteOutcome, DeleteReport, DeployOutcome, DeployReport, StackDeployer};
pub use stack::{
    CloudFormationProvider, DeploymentRequest, EventDiagnostics, OperationPoller,
    OperationSubmitter, OutputExtractor, StackExistenceProbe, StackProvider, StackState,
};
