//! contract_host: host plain Rust service contracts over in-process,
//! action-addressed and REST (JSON/XML) bindings.
//!
//! A contract is a trait whose trait object implements [`Contract`], declaring
//! each operation once. From that table the crate resolves REST requests to
//! operations, binds URL segments and query keys into the operation's
//! parameter object, invokes the implementation and translates faults into
//! the reply's failure fields.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use contract_host::{Contract, ContractBuilder, HostManager, HostOptions, Implementation,
//!     InProcessDirectory, ServiceCatalog};
//!
//! let mut catalog = ServiceCatalog::new();
//! catalog.register(
//!     Implementation::new("customers")
//!         .contract(Arc::new(InMemoryCustomers::default()) as Arc<dyn CustomerService>),
//! );
//!
//! let directory = InProcessDirectory::new();
//! let manager = HostManager::new(catalog).with_in_process(directory.clone());
//! manager.register_host("customers", None, "inproc://customers", HostOptions::default())?;
//!
//! let reply: GetCustomerResponse = directory
//!     .connect("inproc://customers")?
//!     .call("GetCustomer", &GetCustomerRequest { id: "42".into() })
//!     .await?;
//! ```

extern crate self as contract_host;

pub mod binding;
pub mod codec;
pub mod contract;
mod error;
pub mod host;
pub mod pipeline;
pub mod resolver;
pub mod translate;

pub use binding::{Dispatcher, ServiceBinding};
pub use codec::{Casing, WireFormat};
pub use contract::{
    describe, Contract, ContractBuilder, ContractDescriptor, FailureFields, FileContent,
    FileResponse, HttpVerb, OperationBuilder, OperationDescriptor, ParamKind, ParamType,
    Parameter, PropertyDecl, Reply, ServiceResponse,
};
pub use error::{Fault, HostError, InvocationError};
pub use host::{
    BindingStyle, ConcurrencyMode, HostHandle, HostHooks, HostInfo, HostLifecycle, HostManager,
    HostOptions, HostSelector, HostSettings, Implementation, InProcessChannel,
    InProcessDirectory, MessageSize, ServiceCatalog,
};
pub use pipeline::{
    Authorizer, CorsPolicy, DispatchMode, Identity, Pipeline, PipelineOptions, RequestContext,
    WireRequest, WireResponse,
};

// Derive macros share their trait's name, as serde's do.
pub use contract_host_macros::{ParamEnum, Parameter};
