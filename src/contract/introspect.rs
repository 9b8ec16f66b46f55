//! Derives operation descriptors from declared attributes.
//!
//! Rules:
//! - Verb: the REST attribute's verb when it declares exactly one, else POST.
//! - Exposed name: the attribute's explicit name verbatim (an empty name marks
//!   the default operation), else the method name.
//! - A single unannotated property binds inline at sequence 0 and is also
//!   reachable as a named key. With more than one property only explicitly
//!   annotated properties bind to the URL; the rest are body-only.

use super::descriptor::{
    ContractDescriptor, HttpVerb, OperationDescriptor, ParameterDescriptor, PropertyBinding,
};
use super::parameter::{BindingMode, PropertyDecl};
use crate::error::HostError;

/// REST attribute declared on an operation.
#[derive(Debug, Clone, Default)]
pub struct RestAttribute {
    pub verbs: Vec<HttpVerb>,
    pub name: Option<String>,
}

/// Raw, undigested operation declaration.
#[derive(Debug, Clone)]
pub struct OperationDecl {
    pub method: String,
    pub rest: Option<RestAttribute>,
    pub parameter: Option<ParameterDescriptor>,
    pub arity: usize,
    pub result_type: &'static str,
    pub auto_handle_exceptions: bool,
    pub roles: Vec<String>,
}

impl OperationDecl {
    pub fn new(method: &str, result_type: &'static str) -> Self {
        Self {
            method: method.to_string(),
            rest: None,
            parameter: None,
            arity: 0,
            result_type,
            auto_handle_exceptions: false,
            roles: Vec::new(),
        }
    }

    pub(crate) fn rest_mut(&mut self) -> &mut RestAttribute {
        self.rest.get_or_insert_with(RestAttribute::default)
    }
}

/// Digest one operation declaration.
pub fn describe_operation(decl: &OperationDecl) -> OperationDescriptor {
    let (inline, named) = decl
        .parameter
        .as_ref()
        .map(|p| split_bindings(&p.properties))
        .unwrap_or_default();

    OperationDescriptor {
        method: decl.method.clone(),
        rest_name: resolve_name(decl.rest.as_ref()),
        verb: resolve_verb(decl.rest.as_ref()),
        inline,
        named,
        parameter: decl.parameter.clone(),
        arity: decl.arity,
        result_type: decl.result_type,
        auto_handle_exceptions: decl.auto_handle_exceptions,
        roles: decl.roles.clone(),
    }
}

fn resolve_verb(rest: Option<&RestAttribute>) -> HttpVerb {
    match rest {
        Some(attr) if attr.verbs.len() == 1 => attr.verbs[0],
        _ => HttpVerb::Post,
    }
}

fn resolve_name(rest: Option<&RestAttribute>) -> Option<String> {
    rest.and_then(|attr| attr.name.clone())
}

/// Split properties into ordered inline bindings and named bindings.
pub fn split_bindings(properties: &[PropertyDecl]) -> (Vec<PropertyBinding>, Vec<PropertyBinding>) {
    let binding = |p: &PropertyDecl| PropertyBinding {
        name: p.name.to_string(),
        kind: p.kind.clone(),
        sequence: p.sequence,
    };

    if let [only] = properties {
        return match only.mode {
            None => {
                let mut inline = binding(only);
                inline.sequence = 0;
                (vec![inline], vec![binding(only)])
            }
            Some(BindingMode::Inline) => (vec![binding(only)], Vec::new()),
            Some(BindingMode::Named) => (Vec::new(), vec![binding(only)]),
            Some(BindingMode::Body) => (Vec::new(), Vec::new()),
        };
    }

    let mut inline: Vec<PropertyBinding> = properties
        .iter()
        .filter(|p| p.mode == Some(BindingMode::Inline))
        .map(binding)
        .collect();
    // Stable: ties keep declaration order.
    inline.sort_by_key(|p| p.sequence);

    let named = properties
        .iter()
        .filter(|p| p.mode == Some(BindingMode::Named))
        .map(binding)
        .collect();

    (inline, named)
}

/// Reject contracts whose operations take more than one parameter.
pub fn validate(contract: &ContractDescriptor) -> Result<(), HostError> {
    match contract.operations.iter().find(|op| op.arity > 1) {
        Some(op) => Err(HostError::TooManyParameters {
            operation: format!("{}::{}", contract.name, op.method),
            count: op.arity,
        }),
        None => Ok(()),
    }
}
