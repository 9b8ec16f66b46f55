//! Error types for contract hosting.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

/// Failure raised by an operation implementation.
pub type Fault = Box<dyn Error + Send + Sync>;

/// Error type for hosting, binding and dispatch.
#[derive(Debug)]
pub enum HostError {
    /// The implementation does not expose exactly one operations contract.
    ContractAmbiguous { implementation: String, reason: String },
    /// No declared operation matches the inbound verb and fragment.
    OperationNotFound { verb: String, fragment: String },
    /// A single URL token could not be converted to its target type.
    ParameterConversion { value: String, target: String },
    /// Binding a URL-derived value onto the parameter object failed.
    ParameterBindingFailed { key: String, reason: String },
    /// An operation declares more than one input parameter.
    TooManyParameters { operation: String, count: usize },
    /// Authorization hook, HTTPS-only policy or role membership rejected the call.
    Unauthorized(String),
    /// Any other failure raised while invoking an operation.
    Unhandled(String),
    /// The request body could not be deserialized.
    BodyDecode(String),
    /// The result could not be serialized.
    BodyEncode(String),
    /// No implementation registered under this name.
    UnknownImplementation(String),
    /// No transport registered for the address scheme.
    UnsupportedScheme(String),
    /// No in-process host listens at this address.
    EndpointNotFound(String),
    /// The underlying transport failed to open.
    Transport(String),
    /// A shared map lock was poisoned.
    LockPoisoned(&'static str),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::ContractAmbiguous {
                implementation,
                reason,
            } => write!(
                f,
                "contract ambiguous for {}: {} (supply the contract explicitly)",
                implementation, reason
            ),
            HostError::OperationNotFound { verb, fragment } => {
                write!(f, "no operation matches {} {}", verb, fragment)
            }
            HostError::ParameterConversion { value, target } => {
                write!(f, "cannot convert {:?} to {}", value, target)
            }
            HostError::ParameterBindingFailed { key, reason } => {
                write!(f, "parameter binding failed for {}: {}", key, reason)
            }
            HostError::TooManyParameters { operation, count } => write!(
                f,
                "operation {} declares {} parameters, at most one is supported",
                operation, count
            ),
            HostError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            HostError::Unhandled(msg) => write!(f, "unhandled: {}", msg),
            HostError::BodyDecode(msg) => write!(f, "body decode failed: {}", msg),
            HostError::BodyEncode(msg) => write!(f, "body encode failed: {}", msg),
            HostError::UnknownImplementation(name) => {
                write!(f, "unknown implementation: {}", name)
            }
            HostError::UnsupportedScheme(address) => {
                write!(f, "no transport for address {}", address)
            }
            HostError::EndpointNotFound(address) => {
                write!(f, "no in-process host at {}", address)
            }
            HostError::Transport(msg) => write!(f, "transport error: {}", msg),
            HostError::LockPoisoned(operation) => {
                write!(f, "host registry lock poisoned during {}", operation)
            }
        }
    }
}

impl Error for HostError {}

impl HostError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            HostError::OperationNotFound { .. } => 404,
            HostError::EndpointNotFound(_) => 404,
            HostError::ParameterConversion { .. } => 400,
            HostError::ParameterBindingFailed { .. } => 400,
            HostError::BodyDecode(_) => 400,
            HostError::Unauthorized(_) => 401,
            _ => 500,
        }
    }

    pub(crate) fn binding(key: &str, err: HostError) -> HostError {
        HostError::ParameterBindingFailed {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::BodyDecode(err.to_string())
    }
}

/// Delivery wrapper around a failure raised inside an operation.
///
/// The dispatcher wraps every operation failure in exactly one
/// `InvocationError`; fault translation unwraps that one level.
#[derive(Debug)]
pub struct InvocationError {
    operation: String,
    error_type: &'static str,
    backtrace: Backtrace,
    source: Fault,
}

impl InvocationError {
    pub(crate) fn new(operation: &str, error_type: &'static str, source: Fault) -> Self {
        Self {
            operation: operation.to_string(),
            error_type,
            backtrace: Backtrace::capture(),
            source,
        }
    }

    /// Name of the operation that failed.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Type name of the error returned by the operation.
    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    /// The failure the operation returned.
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Backtrace captured where the failure was delivered, when enabled.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.backtrace),
            _ => None,
        }
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation {} failed: {}", self.operation, self.source)
    }
}

impl Error for InvocationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}
