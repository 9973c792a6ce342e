//! Scripted in-memory stack provider used by the tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{ProviderError, ProviderErrorKind};

use super::provider::{ProviderResult, StackProvider};
use super::types::{
    DeploymentRequest, OperationHandle, StackDescription, StackEvent, StackOutput, StackState,
};

/// What the fake answers to an update submission.
#[derive(Debug, Clone)]
pub enum UpdateReply {
    /// Accept the update.
    Accept,
    /// Report that nothing changes.
    NoChanges,
    /// Fail with the given kind and message.
    Fail(ProviderErrorKind, String),
}

#[derive(Debug, Default)]
struct Calls {
    describe: usize,
    describe_after_submit: usize,
    create: usize,
    update: usize,
    delete: usize,
    events: usize,
    outputs: usize,
    submitted: Vec<DeploymentRequest>,
}

/// In-memory provider that replays a status script after a submission.
#[derive(Debug)]
pub struct FakeStackProvider {
    initial: StackState,
    script: Mutex<VecDeque<StackState>>,
    submitted: Mutex<bool>,
    update_reply: UpdateReply,
    describe_error: Option<ProviderError>,
    events: Vec<StackEvent>,
    outputs: Vec<StackOutput>,
    calls: Mutex<Calls>,
}

impl FakeStackProvider {
    /// A provider where the stack does not exist yet.
    pub fn absent() -> Self {
        Self::with_initial(StackState::NotFound)
    }

    /// A provider where the stack exists in the given state.
    pub fn existing(state: StackState) -> Self {
        Self::with_initial(state)
    }

    fn with_initial(initial: StackState) -> Self {
        Self {
            initial,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(false),
            update_reply: UpdateReply::Accept,
            describe_error: None,
            events: Vec::new(),
            outputs: Vec::new(),
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Statuses returned by describe once an operation was submitted.
    ///
    /// The last status repeats forever.
    pub fn with_script(self, states: impl IntoIterator<Item = StackState>) -> Self {
        *self.script.lock().expect("script lock") = states.into_iter().collect();
        self
    }

    pub fn with_update_reply(mut self, reply: UpdateReply) -> Self {
        self.update_reply = reply;
        self
    }

    pub fn with_describe_error(mut self, error: ProviderError) -> Self {
        self.describe_error = Some(error);
        self
    }

    pub fn with_events(mut self, events: Vec<StackEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<StackOutput>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").describe
    }

    pub fn describe_calls_after_submit(&self) -> usize {
        self.calls.lock().expect("calls lock").describe_after_submit
    }

    pub fn create_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").create
    }

    pub fn update_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").update
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").delete
    }

    pub fn event_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").events
    }

    pub fn output_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").outputs
    }

    pub fn submitted_requests(&self) -> Vec<DeploymentRequest> {
        self.calls.lock().expect("calls lock").submitted.clone()
    }

    fn mark_submitted(&self) {
        *self.submitted.lock().expect("submitted lock") = true;
    }

    fn current_state(&self) -> StackState {
        if !*self.submitted.lock().expect("submitted lock") {
            return self.initial.clone();
        }
        self.calls.lock().expect("calls lock").describe_after_submit += 1;
        let mut script = self.script.lock().expect("script lock");
        if script.len() > 1 {
            script.pop_front().unwrap_or(StackState::NotFound)
        } else {
            script.front().cloned().unwrap_or(StackState::NotFound)
        }
    }
}

#[async_trait]
impl StackProvider for FakeStackProvider {
    async fn describe_stack(&self, name: &str) -> ProviderResult<StackDescription> {
        self.calls.lock().expect("calls lock").describe += 1;
        if let Some(err) = &self.describe_error {
            return Err(err.clone());
        }

        let state = self.current_state();
        if state == StackState::NotFound {
            return Err(ProviderError::not_found("DescribeStacks", name));
        }

        let outputs = if matches!(state, StackState::CreateComplete | StackState::UpdateComplete) {
            self.outputs.clone()
        } else {
            Vec::new()
        };

        Ok(StackDescription {
            name: name.to_string(),
            stack_id: Some(format!("fake:{name}")),
            state,
            status_reason: None,
            outputs,
        })
    }

    async fn create_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.create += 1;
            calls.submitted.push(request.clone());
        }
        self.mark_submitted();
        Ok(OperationHandle {
            stack_id: format!("fake:{}", request.stack_name),
            request_token: None,
        })
    }

    async fn update_stack(&self, request: &DeploymentRequest) -> ProviderResult<OperationHandle> {
        {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.update += 1;
            calls.submitted.push(request.clone());
        }
        match &self.update_reply {
            UpdateReply::Accept => {
                self.mark_submitted();
                Ok(OperationHandle {
                    stack_id: format!("fake:{}", request.stack_name),
                    request_token: None,
                })
            }
            UpdateReply::NoChanges => Err(ProviderError::new(
                ProviderErrorKind::NoOp,
                "UpdateStack",
                "No updates are to be performed.",
            )),
            UpdateReply::Fail(kind, message) => {
                Err(ProviderError::new(*kind, "UpdateStack", message.clone()))
            }
        }
    }

    async fn delete_stack(&self, name: &str) -> ProviderResult<OperationHandle> {
        self.calls.lock().expect("calls lock").delete += 1;
        self.mark_submitted();
        Ok(OperationHandle {
            stack_id: format!("fake:{name}"),
            request_token: None,
        })
    }

    async fn list_events(&self, _name: &str) -> ProviderResult<Vec<StackEvent>> {
        self.calls.lock().expect("calls lock").events += 1;
        Ok(self.events.clone())
    }

    async fn get_outputs(&self, _name: &str) -> ProviderResult<Vec<StackOutput>> {
        self.calls.lock().expect("calls lock").outputs += 1;
        Ok(self.outputs.clone())
    }

    async fn validate_template(&self, template_body: &str) -> ProviderResult<()> {
        if template_body.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::Other,
                "ValidateTemplate",
                "Template format error: empty template",
            ));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
