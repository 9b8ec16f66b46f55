//! Contracts: operation tables declared once per contract type.
//!
//! A contract is a trait; `Contract` is implemented for its trait object and
//! declares every operation with a typed handler plus REST attributes. The
//! resulting table (descriptor + invokers) is built on first use and cached
//! for the life of the process.
//!
//! ## Example
//!
//! ```ignore
//! pub trait CustomerService: Send + Sync {
//!     fn get_customer(&self, req: GetCustomerRequest) -> Result<GetCustomerResponse, Fault>;
//!     fn search(&self, req: SearchRequest) -> Result<SearchResponse, Fault>;
//! }
//!
//! impl Contract for dyn CustomerService {
//!     const NAME: &'static str = "CustomerService";
//!
//!     fn declare(contract: &mut ContractBuilder<Self>) {
//!         contract.auto_handle_exceptions();
//!         contract.operation("GetCustomer", |svc: Arc<Self>, req: GetCustomerRequest| async move {
//!             svc.get_customer(req)
//!         });
//!         contract
//!             .operation("Search", |svc: Arc<Self>, req: SearchRequest| async move { svc.search(req) })
//!             .get()
//!             .rest_name("CustomerSearch");
//!     }
//! }
//! ```

mod descriptor;
mod introspect;
mod parameter;
mod reply;

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::codec::body::xml_to_value;
use crate::error::{Fault, HostError, InvocationError};

pub use descriptor::{
    ContractDescriptor, HttpVerb, OperationDescriptor, ParameterDescriptor, PropertyBinding,
};
pub use introspect::{describe_operation, split_bindings, validate, OperationDecl, RestAttribute};
pub use parameter::{
    convert_from_str, convert_json, BindingMode, Converter, ParamKind, ParamType, Parameter, PropertyDecl,
};
pub use reply::{FailureFields, FileContent, FileResponse, Reply, ServiceResponse};

/// A service contract, implemented for the contract's trait object type.
pub trait Contract: Send + Sync + 'static {
    /// Contract name, used as the declaring type in fault messages.
    const NAME: &'static str;

    /// Declare the contract's operations.
    fn declare(contract: &mut ContractBuilder<Self>);
}

/// Raw file body produced by a file-like reply.
#[derive(Debug, Clone)]
pub(crate) struct FileBody {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Type-erased operation result.
#[derive(Debug, Clone)]
pub(crate) struct Output {
    pub value: Value,
    pub file: Option<FileBody>,
}

impl Output {
    fn from_reply<R: Reply>(reply: &R) -> Result<Self, Fault> {
        let file = reply.file_content().map(|f| FileBody {
            content_type: f.content_type.to_string(),
            file_name: f.file_name.to_string(),
            bytes: f.bytes.to_vec(),
        });
        let value = serde_json::to_value(reply)
            .map_err(|e| Box::new(HostError::BodyEncode(e.to_string())) as Fault)?;
        Ok(Self { value, file })
    }

    pub(crate) fn value(value: Value) -> Self {
        Self { value, file: None }
    }
}

pub(crate) type Invocation = BoxFuture<'static, Result<Output, Fault>>;

pub(crate) type Invoker<C> = Arc<dyn Fn(Arc<C>, Vec<Value>) -> Invocation + Send + Sync>;

/// Invoker plus the typed hooks the pipeline needs for one operation.
pub(crate) struct OperationEntry<C: ?Sized> {
    pub invoke: Invoker<C>,
    /// Default-constructed parameter, for requests with an empty body.
    pub default_parameter: Option<fn() -> Result<Value, serde_json::Error>>,
    pub decode_xml: Option<fn(&str) -> Result<Value, String>>,
    /// Default reply with its failure fields populated.
    pub failure: fn(String) -> Result<Value, serde_json::Error>,
    /// XML root element for the reply.
    pub root: &'static str,
}

/// Descriptor and invokers of one contract type.
pub(crate) struct ContractTable<C: ?Sized> {
    pub descriptor: Arc<ContractDescriptor>,
    pub entries: Vec<OperationEntry<C>>,
}

/// Collects operation declarations for a contract.
pub struct ContractBuilder<C: ?Sized> {
    name: String,
    namespace: Option<String>,
    auto_handle_exceptions: bool,
    decls: Vec<OperationDecl>,
    entries: Vec<OperationEntry<C>>,
}

impl<C: ?Sized + Send + Sync + 'static> ContractBuilder<C> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: None,
            auto_handle_exceptions: false,
            decls: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Contract-level namespace metadata.
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Translate faults from every operation into failure replies.
    pub fn auto_handle_exceptions(&mut self) -> &mut Self {
        self.auto_handle_exceptions = true;
        self
    }

    /// Declare an operation taking one parameter object.
    pub fn operation<P, R, E, F, Fut>(&mut self, method: &str, handler: F) -> OperationBuilder<'_>
    where
        P: Parameter,
        R: Reply,
        E: Into<Fault> + 'static,
        F: Fn(Arc<C>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let name = method.to_string();
        let invoke: Invoker<C> = Arc::new(move |svc: Arc<C>, args: Vec<Value>| -> Invocation {
            let handler = handler.clone();
            let name = name.clone();
            Box::pin(async move {
                let param = take_parameter::<P>(args)?;
                let reply = handler(svc, param)
                    .await
                    .map_err(|e| deliver::<E>(&name, e))?;
                Output::from_reply(&reply)
            })
        });

        let mut decl = OperationDecl::new(method, type_name::<R>());
        decl.arity = 1;
        decl.parameter = Some(ParameterDescriptor {
            type_name: type_name::<P>(),
            properties: P::properties(),
        });

        self.push(
            decl,
            OperationEntry {
                invoke,
                default_parameter: Some(default_parameter::<P>),
                decode_xml: Some(xml_to_value::<P>),
                failure: failure_reply::<R>,
                root: short_type_name(type_name::<R>()),
            },
        )
    }

    /// Declare an operation taking no parameters.
    pub fn operation0<R, E, F, Fut>(&mut self, method: &str, handler: F) -> OperationBuilder<'_>
    where
        R: Reply,
        E: Into<Fault> + 'static,
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let name = method.to_string();
        let invoke: Invoker<C> = Arc::new(move |svc: Arc<C>, _args: Vec<Value>| -> Invocation {
            let handler = handler.clone();
            let name = name.clone();
            Box::pin(async move {
                let reply = handler(svc).await.map_err(|e| deliver::<E>(&name, e))?;
                Output::from_reply(&reply)
            })
        });

        self.push(
            OperationDecl::new(method, type_name::<R>()),
            OperationEntry {
                invoke,
                default_parameter: None,
                decode_xml: None,
                failure: failure_reply::<R>,
                root: short_type_name(type_name::<R>()),
            },
        )
    }

    /// Declare an operation dispatched reflectively by parameter array.
    ///
    /// `arity` is the declared parameter count; contracts with an arity above
    /// one are rejected when hosted. `R` is the reply type populated when a
    /// fault is translated.
    pub fn operation_raw<R, F>(&mut self, method: &str, arity: usize, handler: F) -> OperationBuilder<'_>
    where
        R: Reply,
        F: Fn(Arc<C>, Vec<Value>) -> BoxFuture<'static, Result<Value, Fault>>
            + Send
            + Sync
            + 'static,
    {
        let handler = Arc::new(handler);
        let name = method.to_string();
        let invoke: Invoker<C> = Arc::new(move |svc: Arc<C>, args: Vec<Value>| -> Invocation {
            let handler = handler.clone();
            let name = name.clone();
            Box::pin(async move {
                let value = handler(svc, args)
                    .await
                    .map_err(|e| deliver::<Fault>(&name, e))?;
                Ok::<_, Fault>(Output::value(value))
            })
        });

        let mut decl = OperationDecl::new(method, type_name::<R>());
        decl.arity = arity;

        self.push(
            decl,
            OperationEntry {
                invoke,
                default_parameter: None,
                decode_xml: None,
                failure: failure_reply::<R>,
                root: short_type_name(type_name::<R>()),
            },
        )
    }

    fn push(&mut self, decl: OperationDecl, entry: OperationEntry<C>) -> OperationBuilder<'_> {
        let index = self.decls.len();
        self.decls.push(decl);
        self.entries.push(entry);
        OperationBuilder {
            decl: &mut self.decls[index],
        }
    }

    fn build(self) -> ContractTable<C> {
        let descriptor = ContractDescriptor {
            name: self.name,
            namespace: self.namespace,
            auto_handle_exceptions: self.auto_handle_exceptions,
            operations: self.decls.iter().map(describe_operation).collect(),
        };
        ContractTable {
            descriptor: Arc::new(descriptor),
            entries: self.entries,
        }
    }
}

/// Attributes of one declared operation.
pub struct OperationBuilder<'a> {
    decl: &'a mut OperationDecl,
}

impl OperationBuilder<'_> {
    pub fn get(self) -> Self {
        self.verb(HttpVerb::Get)
    }

    pub fn post(self) -> Self {
        self.verb(HttpVerb::Post)
    }

    pub fn put(self) -> Self {
        self.verb(HttpVerb::Put)
    }

    pub fn delete(self) -> Self {
        self.verb(HttpVerb::Delete)
    }

    pub fn post_or_put(self) -> Self {
        self.verb(HttpVerb::PostOrPut)
    }

    pub fn verb(self, verb: HttpVerb) -> Self {
        self.verbs(&[verb])
    }

    /// Declare several verbs. Anything other than exactly one falls back to POST.
    pub fn verbs(self, verbs: &[HttpVerb]) -> Self {
        self.decl.rest_mut().verbs = verbs.to_vec();
        self
    }

    /// Exposed REST name. An empty name marks the default operation for the verb.
    pub fn rest_name(self, name: &str) -> Self {
        self.decl.rest_mut().name = Some(name.to_string());
        self
    }

    pub fn auto_handle_exceptions(self) -> Self {
        self.decl.auto_handle_exceptions = true;
        self
    }

    /// Restrict the operation to callers carrying at least one of `roles`.
    pub fn roles(self, roles: &[&str]) -> Self {
        self.decl.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }
}

fn take_parameter<P: Parameter>(args: Vec<Value>) -> Result<P, Fault> {
    match args.into_iter().next() {
        None | Some(Value::Null) => Ok(P::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| Box::new(HostError::BodyDecode(e.to_string())) as Fault),
    }
}

fn deliver<E: Into<Fault> + 'static>(operation: &str, err: E) -> Fault {
    Box::new(InvocationError::new(operation, type_name::<E>(), err.into()))
}

fn default_parameter<P: Parameter>() -> Result<Value, serde_json::Error> {
    serde_json::to_value(P::default())
}

fn failure_reply<R: Reply>(message: String) -> Result<Value, serde_json::Error> {
    serde_json::to_value(crate::translate::populate::<R>(message))
}

/// Last path segment of a type name, without generics.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);
    if !short.is_empty() && short.chars().all(|c| c.is_alphanumeric() || c == '_') {
        short
    } else {
        "Result"
    }
}

type TableCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn tables() -> &'static TableCache {
    static TABLES: OnceLock<TableCache> = OnceLock::new();
    TABLES.get_or_init(Default::default)
}

fn build_table<C: Contract + ?Sized>() -> ContractTable<C> {
    let mut builder = ContractBuilder::new(C::NAME);
    C::declare(&mut builder);
    let table = builder.build();
    tracing::debug!(
        contract = C::NAME,
        operations = table.entries.len(),
        "contract table built"
    );
    table
}

/// The cached table for contract `C`. Entries are immutable once published.
pub(crate) fn table<C: Contract + ?Sized>() -> Arc<ContractTable<C>> {
    let key = TypeId::of::<C>();
    let cached = tables()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(Ok(table)) = cached.map(|t| t.downcast::<ContractTable<C>>()) {
        return table;
    }

    let built: Arc<dyn Any + Send + Sync> = Arc::new(build_table::<C>());
    let published = tables()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(built)
        .clone();
    published
        .downcast::<ContractTable<C>>()
        .unwrap_or_else(|_| Arc::new(build_table::<C>()))
}

/// Describe contract `C`.
pub fn describe<C: Contract + ?Sized>() -> Arc<ContractDescriptor> {
    table::<C>().descriptor.clone()
}
