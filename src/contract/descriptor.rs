//! Immutable descriptions of contracts and their operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::parameter::{ParamKind, PropertyDecl};

/// HTTP verb of a request, or the verb an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    /// Operation-side sentinel accepting either POST or PUT.
    PostOrPut,
    Options,
}

impl HttpVerb {
    /// Parse a wire method name, case-insensitively.
    pub fn parse(method: &str) -> Option<Self> {
        let verb = match method.to_ascii_uppercase().as_str() {
            "GET" => HttpVerb::Get,
            "POST" => HttpVerb::Post,
            "PUT" => HttpVerb::Put,
            "DELETE" => HttpVerb::Delete,
            "POSTORPUT" => HttpVerb::PostOrPut,
            "OPTIONS" => HttpVerb::Options,
            _ => return None,
        };
        Some(verb)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::PostOrPut => "POSTORPUT",
            HttpVerb::Options => "OPTIONS",
        }
    }

    /// Whether an operation declared with `self` accepts a request made with `request`.
    pub fn accepts(self, request: HttpVerb) -> bool {
        self == request
            || (self == HttpVerb::PostOrPut
                && matches!(request, HttpVerb::Post | HttpVerb::Put))
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property bound to the URL, inline or named.
#[derive(Debug, Clone)]
pub struct PropertyBinding {
    pub name: String,
    pub kind: ParamKind,
    pub sequence: u32,
}

/// The parameter type of an operation with every declared property.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub type_name: &'static str,
    pub properties: Vec<PropertyDecl>,
}

impl ParameterDescriptor {
    /// Property lookup that ignores case and underscores, so `CustomerId`,
    /// `customerId` and `customer_id` all find the same property.
    pub fn find(&self, name: &str) -> Option<&PropertyDecl> {
        let wanted = property_key(name);
        self.properties.iter().find(|p| property_key(p.name) == wanted)
    }
}

fn property_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// One contract operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Method name.
    pub method: String,
    /// Explicit REST name. `Some("")` marks the default operation for its
    /// verb; `None` falls back to the method name.
    pub rest_name: Option<String>,
    pub verb: HttpVerb,
    /// Inline properties in segment order.
    pub inline: Vec<PropertyBinding>,
    pub named: Vec<PropertyBinding>,
    pub parameter: Option<ParameterDescriptor>,
    /// Number of declared input parameters.
    pub arity: usize,
    pub result_type: &'static str,
    pub auto_handle_exceptions: bool,
    /// Roles allowed to call the operation; empty means unrestricted.
    pub roles: Vec<String>,
}

impl OperationDescriptor {
    /// Explicit REST name if set, else the method name.
    pub fn exposed_name(&self) -> &str {
        self.rest_name.as_deref().unwrap_or(&self.method)
    }

    /// Whether this is the default (unnamed) operation for its verb.
    pub fn is_default(&self) -> bool {
        self.rest_name.as_deref() == Some("")
    }

    pub fn inline_property(&self, position: usize) -> Option<&PropertyBinding> {
        self.inline.get(position)
    }

    /// Exact, case-sensitive named property lookup.
    pub fn named_property(&self, name: &str) -> Option<&PropertyBinding> {
        self.named.iter().find(|p| p.name == name)
    }
}

/// Description of a contract, built once per contract type.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub name: String,
    pub namespace: Option<String>,
    pub auto_handle_exceptions: bool,
    /// Operations in declaration order.
    pub operations: Vec<OperationDescriptor>,
}

impl ContractDescriptor {
    /// Look up an operation by method name.
    pub fn operation(&self, method: &str) -> Option<(usize, &OperationDescriptor)> {
        self.operations
            .iter()
            .enumerate()
            .find(|(_, op)| op.method == method)
    }

    /// Whether faults raised by `operation` are translated into failure replies.
    pub fn auto_handles(&self, operation: &OperationDescriptor) -> bool {
        self.auto_handle_exceptions || operation.auto_handle_exceptions
    }
}
