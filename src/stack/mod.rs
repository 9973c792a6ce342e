//! Stack provider integration module.
//!
//! This module provides the provider abstraction, the AWS `CloudFormation`
//! adapter, and the components that probe, submit, poll, and inspect stacks.

mod cloudformation;
mod events;
mod outputs;
mod poller;
mod probe;
mod provider;
mod submitter;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use cloudformation::{CloudFormationProvider, classify_error};
pub use events::{DEFAULT_EVENT_LIMIT, EventDiagnostics, EventLine, EventSummary, NO_REASON};
pub use outputs::OutputExtractor;
pub use poller::{CancelSignal, OperationPoller, PollReport, PollState, PollTermination, classify};
pub use probe::{StackExistenceProbe, StackPresence};
#[cfg(test)]
pub use provider::MockStackProvider;
pub use provider::{ProviderResult, StackProvider};
pub use submitter::{OperationSubmitter, SubmissionOutcome};
pub use types::{
    DeploymentRequest, OperationHandle, OperationKind, ParameterSet, StackDescription, StackEvent,
    StackOutput, StackState,
};
