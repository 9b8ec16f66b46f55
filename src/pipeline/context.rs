//! Per-request context and pipeline states.

use std::fmt;

use serde_json::Value;

use super::identity::Identity;
use super::request::WireRequest;
use crate::codec::WireFormat;
use crate::contract::{HttpVerb, OperationDescriptor};

/// States of the request pipeline.
///
/// `Received -> Authorizing -> BuildingParameters -> Invoking ->
/// TranslatingResult -> Sending -> Done`, with `Faulted` reachable from
/// `Authorizing`, `BuildingParameters` and `Invoking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Authorizing,
    BuildingParameters,
    Invoking,
    Faulted,
    TranslatingResult,
    Sending,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One in-flight request. Created per request and never shared.
pub struct RequestContext<'a> {
    contract: &'a str,
    verb: HttpVerb,
    request: WireRequest,
    format: WireFormat,
    operation: Option<&'a OperationDescriptor>,
    parameter: Option<Value>,
    result: Option<Value>,
    state: PipelineState,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(contract: &'a str, verb: HttpVerb, request: WireRequest, format: WireFormat) -> Self {
        Self {
            contract,
            verb,
            request,
            format,
            operation: None,
            parameter: None,
            result: None,
            state: PipelineState::Received,
        }
    }

    /// Name of the contract handling the request.
    pub fn contract(&self) -> &str {
        self.contract
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn request(&self) -> &WireRequest {
        &self.request
    }

    pub fn identity(&self) -> &Identity {
        &self.request.identity
    }

    /// Output format of the response.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The resolved operation, once resolution succeeded.
    pub fn operation(&self) -> Option<&'a OperationDescriptor> {
        self.operation
    }

    /// The materialized parameter object.
    pub fn parameter(&self) -> Option<&Value> {
        self.parameter.as_ref()
    }

    /// The operation result or translated failure reply.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn enter(&mut self, state: PipelineState) {
        tracing::debug!(
            contract = self.contract,
            operation = self.operation.map(|op| op.method.as_str()),
            from = %self.state,
            to = %state,
            "pipeline transition"
        );
        self.state = state;
    }

    pub(crate) fn set_operation(&mut self, operation: &'a OperationDescriptor) {
        self.operation = Some(operation);
    }

    pub(crate) fn set_parameter(&mut self, parameter: Value) {
        self.parameter = Some(parameter);
    }

    pub(crate) fn set_result(&mut self, result: Value) {
        self.result = Some(result);
    }
}
