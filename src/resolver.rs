//! REST operation selection.
//!
//! Two passes over the operations in declaration order, first match wins:
//!
//! 1. Named operations whose exposed name equals the first fragment segment
//!    (case-insensitive) and whose verb accepts the request verb.
//! 2. Default operations (exposed name `""`) whose verb accepts the request
//!    verb. These consume nothing from the fragment.
//!
//! Pass 1 always wins over pass 2, whatever the declaration order.

use crate::contract::{ContractDescriptor, HttpVerb, OperationDescriptor};
use crate::error::HostError;

/// A resolved operation plus the unconsumed part of the fragment.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'f, 'c> {
    /// Index of the operation in the contract's declaration order.
    pub index: usize,
    pub operation: &'c OperationDescriptor,
    /// Parameter part of the fragment: `/<inline>...?<query>`.
    pub remainder: &'f str,
    /// Whether the operation was matched by name (pass 1).
    pub by_name: bool,
}

/// Select the operation addressed by `verb` and `fragment`.
pub fn resolve<'f, 'c>(
    fragment: &'f str,
    verb: HttpVerb,
    contract: &'c ContractDescriptor,
) -> Result<Resolution<'f, 'c>, HostError> {
    let trimmed = fragment.strip_prefix('/').unwrap_or(fragment);
    let name_end = trimmed.find(['/', '?']).unwrap_or(trimmed.len());
    let (candidate, rest) = trimmed.split_at(name_end);

    let named = contract.operations.iter().enumerate().find(|(_, op)| {
        !op.is_default()
            && op.verb.accepts(verb)
            && op.exposed_name().eq_ignore_ascii_case(candidate)
    });
    if let Some((index, operation)) = named {
        tracing::debug!(operation = %operation.method, %verb, "resolved by name");
        return Ok(Resolution {
            index,
            operation,
            remainder: rest,
            by_name: true,
        });
    }

    let default = contract
        .operations
        .iter()
        .enumerate()
        .find(|(_, op)| op.is_default() && op.verb.accepts(verb));
    match default {
        Some((index, operation)) => {
            tracing::debug!(operation = %operation.method, %verb, "resolved default operation");
            Ok(Resolution {
                index,
                operation,
                remainder: trimmed,
                by_name: false,
            })
        }
        None => Err(HostError::OperationNotFound {
            verb: verb.to_string(),
            fragment: fragment.to_string(),
        }),
    }
}

/// Select an operation by method name, for action-addressed bindings.
pub fn resolve_action<'c>(
    action: &str,
    contract: &'c ContractDescriptor,
) -> Result<(usize, &'c OperationDescriptor), HostError> {
    let action = action.rsplit('/').next().unwrap_or(action).trim_matches('"');
    contract
        .operations
        .iter()
        .enumerate()
        .find(|(_, op)| op.method == action)
        .ok_or_else(|| HostError::OperationNotFound {
            verb: HttpVerb::Post.to_string(),
            fragment: action.to_string(),
        })
}
