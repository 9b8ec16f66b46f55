//! Host options and their plain-data settings form.

use serde::{Deserialize, Serialize};

use crate::codec::{Casing, WireFormat};
use crate::pipeline::{CorsPolicy, DispatchMode, PipelineOptions};

/// Message-size class of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSize {
    #[default]
    Normal,
    Medium,
    Large,
    VeryLarge,
    Max,
}

impl MessageSize {
    /// Maximum accepted message size in bytes.
    pub fn max_bytes(self) -> usize {
        match self {
            MessageSize::Normal => 65_536,
            MessageSize::Medium => 1024 * 1024,
            MessageSize::Large => 10 * 1024 * 1024,
            MessageSize::VeryLarge => 100 * 1024 * 1024,
            MessageSize::Max => i32::MAX as usize,
        }
    }
}

/// How many calls a host serves at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    #[default]
    Multiple,
    /// One call at a time; later calls wait their turn.
    Single,
}

/// Transport security requested for a binding. Passed through to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    #[default]
    None,
    Transport,
}

/// Wire style of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStyle {
    /// Verb + URL addressed, JSON or XML bodies.
    #[default]
    Rest,
    /// POST addressed by action name.
    Action,
}

impl BindingStyle {
    pub fn dispatch_mode(self) -> DispatchMode {
        match self {
            BindingStyle::Rest => DispatchMode::Rest,
            BindingStyle::Action => DispatchMode::Action,
        }
    }
}

/// Binding computed for an endpoint, rewritable by endpoint hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBinding {
    pub style: BindingStyle,
    pub format: WireFormat,
    pub message_size: MessageSize,
    pub max_message_bytes: usize,
    pub concurrency: ConcurrencyMode,
    pub security: SecurityMode,
}

/// Options for one registered host.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub message_size: MessageSize,
    pub concurrency: ConcurrencyMode,
    pub security: SecurityMode,
    pub binding: BindingStyle,
    pub pipeline: PipelineOptions,
}

impl HostOptions {
    pub fn message_size(mut self, size: MessageSize) -> Self {
        self.message_size = size;
        self
    }

    pub fn concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency = mode;
        self
    }

    pub fn security(mut self, mode: SecurityMode) -> Self {
        self.security = mode;
        self
    }

    pub fn binding(mut self, style: BindingStyle) -> Self {
        self.binding = style;
        self
    }

    pub fn pipeline(mut self, options: PipelineOptions) -> Self {
        self.pipeline = options;
        self
    }

    /// The endpoint binding these options describe.
    pub fn endpoint_binding(&self) -> EndpointBinding {
        EndpointBinding {
            style: self.binding,
            format: self.pipeline.format,
            message_size: self.message_size,
            max_message_bytes: self.message_size.max_bytes(),
            concurrency: self.concurrency,
            security: self.security,
        }
    }
}

/// Serializable host settings, for loading from configuration files.
///
/// ```json
/// { "message_size": "large", "binding": "rest", "casing": "camel_case", "verbose_errors": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub message_size: MessageSize,
    pub concurrency: ConcurrencyMode,
    pub security: SecurityMode,
    pub binding: BindingStyle,
    pub format: WireFormat,
    pub casing: Casing,
    pub verbose_errors: bool,
    pub https_only: bool,
    pub cors: Option<CorsPolicy>,
}

impl From<HostSettings> for HostOptions {
    fn from(settings: HostSettings) -> Self {
        let pipeline = PipelineOptions {
            format: settings.format,
            casing: settings.casing,
            verbose_errors: settings.verbose_errors,
            https_only: settings.https_only,
            cors: settings.cors,
            authorizer: None,
            dispatch: settings.binding.dispatch_mode(),
        };
        HostOptions {
            message_size: settings.message_size,
            concurrency: settings.concurrency,
            security: settings.security,
            binding: settings.binding,
            pipeline,
        }
    }
}
