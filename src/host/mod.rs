//! Service hosting: catalog, host registry, hooks and transports.
//!
//! The [`HostManager`] keeps one host per full address. Registering a second
//! host at an address closes the first. Transports are pluggable by scheme;
//! `inproc://` is always available through [`InProcessDirectory`], and
//! `http://` comes with the `http` feature.

mod catalog;
mod hooks;
mod in_process;
mod options;
mod registry;
mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use catalog::{ContractInterface, HostLifecycle, Implementation, Interface, ServiceCatalog};
pub use hooks::{EndpointAddingEvent, HostAddingEvent, HostHooks};
pub use in_process::{InProcessChannel, InProcessDirectory, InProcessTransport, IN_PROCESS_SCHEME};
pub use options::{
    BindingStyle, ConcurrencyMode, EndpointBinding, HostOptions, HostSettings, MessageSize,
    SecurityMode,
};
pub use registry::{HostHandle, HostInfo, HostManager, HostSelector};
pub use transport::{ConcurrencyGate, Endpoint, EndpointAddress, Listener, Transport};

#[cfg(feature = "http")]
pub use http::HttpTransport;
