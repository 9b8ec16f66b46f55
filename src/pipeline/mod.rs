//! Request pipeline: one inbound call end to end.
//!
//! ```text
//! Received -> Authorizing -> BuildingParameters -> Invoking -> TranslatingResult -> Sending -> Done
//!                  \                 \                  \
//!                   `-----------------`------------------`--> Faulted
//! ```
//!
//! Operation resolution happens on entry so the authorization hook sees the
//! resolved operation. `OPTIONS` under a CORS policy is answered with 204
//! before anything else runs.
//!
//! ## Example
//!
//! ```ignore
//! let pipeline = Pipeline::new(
//!     Arc::new(InMemoryCustomers::default()) as Arc<dyn CustomerService>,
//!     PipelineOptions::default().casing(Casing::CamelCase),
//! )?;
//!
//! let response = pipeline
//!     .process(WireRequest::new("POST", "/GetCustomer").with_body(r#"{"id":"42"}"#))
//!     .await;
//! assert_eq!(response.status, 200);
//! ```

mod auth;
mod context;
mod identity;
mod request;
mod route;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::binding::{Dispatcher, ServiceBinding};
use crate::codec::body::is_empty_body;
use crate::codec::{decode_fragment, parse_query, read_body, value, write_body, Casing, WireFormat};
use crate::contract::{
    validate, Contract, ContractDescriptor, HttpVerb, OperationDescriptor, OperationEntry, Output,
    ParameterDescriptor,
};
use crate::error::{Fault, HostError};
use crate::resolver;
use crate::translate::failure_message;

pub use auth::{Authorizer, CorsPolicy};
pub use context::{PipelineState, RequestContext};
pub use identity::{Identity, IDENTITY_NAME_HEADER, IDENTITY_ROLES_HEADER};
pub use request::{WireRequest, WireResponse};
pub use route::{RouteMatch, RouteTemplate};

/// Product-identifying header sent on every response.
pub const PRODUCT_HEADER: &str = "x-contract-host";
/// Diagnostic header sent with untranslated faults.
pub const FAULT_HEADER: &str = "x-contract-host-fault";
/// Header naming the operation in action-addressed bindings.
pub const ACTION_HEADER: &str = "SOAPAction";

/// Value of [`PRODUCT_HEADER`].
pub fn product() -> String {
    format!("contract_host/{}", env!("CARGO_PKG_VERSION"))
}

/// How inbound requests address operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Verb plus URL fragment, resolved by the REST dispatch algorithm.
    #[default]
    Rest,
    /// POST with the method name in `SOAPAction` or the last path segment.
    Action,
}

/// Pipeline configuration, fixed for the life of a pipeline.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    pub format: WireFormat,
    pub casing: Casing,
    /// Render full error chains in translated failures.
    pub verbose_errors: bool,
    /// Reject plaintext requests when no authorizer is configured.
    pub https_only: bool,
    pub cors: Option<CorsPolicy>,
    pub authorizer: Option<Arc<dyn Authorizer>>,
    pub dispatch: DispatchMode,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("format", &self.format)
            .field("casing", &self.casing)
            .field("verbose_errors", &self.verbose_errors)
            .field("https_only", &self.https_only)
            .field("cors", &self.cors)
            .field("authorizer", &self.authorizer.is_some())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl PipelineOptions {
    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn casing(mut self, casing: Casing) -> Self {
        self.casing = casing;
        self
    }

    pub fn verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    pub fn https_only(mut self) -> Self {
        self.https_only = true;
        self
    }

    pub fn cors(mut self, policy: CorsPolicy) -> Self {
        self.cors = Some(policy);
        self
    }

    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }
}

/// Request pipeline for one hosted contract instance.
pub struct Pipeline<C: Contract + ?Sized> {
    binding: ServiceBinding<C>,
    options: PipelineOptions,
}

impl<C: Contract + ?Sized> Pipeline<C> {
    /// Bind `instance` and validate its contract.
    pub fn new(instance: Arc<C>, options: PipelineOptions) -> Result<Self, HostError> {
        let binding = ServiceBinding::new(instance);
        validate(binding.descriptor())?;
        Ok(Self { binding, options })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn binding(&self) -> &ServiceBinding<C> {
        &self.binding
    }

    /// Run one request through every pipeline state.
    pub async fn process(&self, request: WireRequest) -> WireResponse {
        let contract = self.binding.descriptor();
        let Some(verb) = HttpVerb::parse(&request.method) else {
            return self.reject(HostError::OperationNotFound {
                verb: request.method.clone(),
                fragment: request.path.clone(),
            });
        };
        let mut ctx = RequestContext::new(&contract.name, verb, request, self.options.format);

        if verb == HttpVerb::Options {
            if let Some(cors) = &self.options.cors {
                ctx.enter(PipelineState::Sending);
                let mut response = WireResponse::new(204);
                for (name, value) in cors.preflight_headers() {
                    response.set_header(name, value);
                }
                ctx.enter(PipelineState::Done);
                return self.finish(response);
            }
        }

        let (index, remainder) = match self.resolve(&ctx) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(contract = %contract.name, error = %err, "operation not resolved");
                return self.reject(err);
            }
        };
        let (Some(operation), Some(entry)) =
            (contract.operations.get(index), self.binding.entry(index))
        else {
            return self.reject(HostError::Unhandled(format!("operation {} has no invoker", index)));
        };
        ctx.set_operation(operation);

        ctx.enter(PipelineState::Authorizing);
        if let Err(err) = self.authorize(&ctx, operation) {
            tracing::warn!(
                contract = %contract.name,
                operation = %operation.method,
                error = %err,
                "request rejected"
            );
            ctx.enter(PipelineState::Faulted);
            return self.reject(err);
        }

        ctx.enter(PipelineState::BuildingParameters);
        let args = match self.build_arguments(&ctx, operation, entry, &remainder) {
            Ok(args) => args,
            Err(err) => {
                ctx.enter(PipelineState::Faulted);
                return self.fault(&mut ctx, operation, entry, Box::new(err));
            }
        };
        if let Some(parameter) = args.first() {
            ctx.set_parameter(parameter.clone());
        }

        ctx.enter(PipelineState::Invoking);
        let outcome = match self.binding.invoke(index, args) {
            Some(invocation) => invocation.await,
            None => Err(Box::new(HostError::Unhandled(operation.method.clone())) as Fault),
        };
        match outcome {
            Ok(output) => self.send(&mut ctx, entry, output),
            Err(fault) => {
                ctx.enter(PipelineState::Faulted);
                self.fault(&mut ctx, operation, entry, fault)
            }
        }
    }

    /// Invoke an operation by method name with a parameter array.
    pub async fn invoke_by_name(&self, method: &str, args: Vec<Value>) -> Result<Value, HostError> {
        let contract = self.binding.descriptor();
        let (index, operation) =
            contract
                .operation(method)
                .ok_or_else(|| HostError::OperationNotFound {
                    verb: "invoke".to_string(),
                    fragment: method.to_string(),
                })?;
        if args.len() > 1 {
            return Err(HostError::TooManyParameters {
                operation: format!("{}::{}", contract.name, method),
                count: args.len(),
            });
        }
        let (Some(entry), Some(invocation)) =
            (self.binding.entry(index), self.binding.invoke(index, args))
        else {
            return Err(HostError::Unhandled(format!("operation {} has no invoker", method)));
        };

        match invocation.await {
            Ok(output) => Ok(output.value),
            Err(fault) if contract.auto_handles(operation) => {
                let message =
                    failure_message(fault.as_ref(), &contract.name, method, self.options.verbose_errors);
                tracing::warn!(contract = %contract.name, operation = method, "fault translated");
                (entry.failure)(message).map_err(|e| HostError::BodyEncode(e.to_string()))
            }
            Err(fault) => {
                tracing::error!(contract = %contract.name, operation = method, error = %fault, "unhandled fault");
                Err(match fault.downcast::<HostError>() {
                    Ok(err) => *err,
                    Err(fault) => HostError::Unhandled(fault.to_string()),
                })
            }
        }
    }

    fn resolve(&self, ctx: &RequestContext<'_>) -> Result<(usize, String), HostError> {
        let contract = self.binding.descriptor();
        let request = ctx.request();
        match self.options.dispatch {
            DispatchMode::Rest => {
                let resolution = resolver::resolve(&request.path, ctx.verb(), contract)?;
                Ok((resolution.index, resolution.remainder.to_string()))
            }
            DispatchMode::Action => {
                if ctx.verb() != HttpVerb::Post {
                    return Err(HostError::OperationNotFound {
                        verb: ctx.verb().to_string(),
                        fragment: request.path.clone(),
                    });
                }
                let action = request
                    .header(ACTION_HEADER)
                    .filter(|a| !a.trim_matches('"').is_empty())
                    .unwrap_or(&request.path);
                let (index, _) = resolver::resolve_action(action, contract)?;
                Ok((index, String::new()))
            }
        }
    }

    fn authorize(&self, ctx: &RequestContext<'_>, operation: &OperationDescriptor) -> Result<(), HostError> {
        match &self.options.authorizer {
            Some(authorizer) => {
                if !authorizer.authorize(ctx) {
                    return Err(HostError::Unauthorized(
                        "authorization hook rejected the request".into(),
                    ));
                }
            }
            None => {
                if self.options.https_only && !ctx.request().secure {
                    return Err(HostError::Unauthorized("https is required".into()));
                }
            }
        }

        if !operation.roles.is_empty() && !ctx.identity().is_in_any(&operation.roles) {
            return Err(HostError::Unauthorized(format!(
                "caller lacks a role required by {}",
                operation.method
            )));
        }
        Ok(())
    }

    /// A default instance, then body members, then inline segments, then
    /// query values, then route values. Later sources win.
    fn build_arguments(
        &self,
        ctx: &RequestContext<'_>,
        operation: &OperationDescriptor,
        entry: &OperationEntry<C>,
        remainder: &str,
    ) -> Result<Vec<Value>, HostError> {
        match operation.arity {
            0 => return Ok(Vec::new()),
            1 => {}
            count => {
                return Err(HostError::TooManyParameters {
                    operation: format!("{}::{}", ctx.contract(), operation.method),
                    count,
                })
            }
        }

        let request = ctx.request();
        let parameter = operation.parameter.as_ref();
        let mut object = match entry.default_parameter {
            Some(make) => make().map_err(|e| HostError::BodyDecode(e.to_string()))?,
            None => Value::Null,
        };
        if !is_empty_body(&request.body) {
            let body = read_body(
                self.options.format,
                self.options.casing,
                &request.body,
                parameter,
                entry.decode_xml,
            )?;
            // Members the body leaves out keep their default values.
            object = match (object, body) {
                (Value::Object(mut defaults), Value::Object(members)) => {
                    defaults.extend(members);
                    Value::Object(defaults)
                }
                (_, body) => body,
            };
        }

        if let (Some(parameter), Value::Object(map)) = (parameter, &mut object) {
            if self.options.dispatch == DispatchMode::Rest {
                for (name, value) in decode_fragment(remainder, operation)? {
                    map.insert(name, value);
                }
            }
            let query = request.query.as_deref().map(parse_query).unwrap_or_default();
            overlay(map, parameter, &query)?;
            overlay(map, parameter, &request.route_values)?;
        }
        Ok(vec![object])
    }

    fn fault(
        &self,
        ctx: &mut RequestContext<'_>,
        operation: &OperationDescriptor,
        entry: &OperationEntry<C>,
        fault: Fault,
    ) -> WireResponse {
        let contract = self.binding.descriptor();
        if contract.auto_handles(operation) {
            let message = failure_message(
                fault.as_ref(),
                &contract.name,
                &operation.method,
                self.options.verbose_errors,
            );
            tracing::warn!(
                contract = %contract.name,
                operation = %operation.method,
                error = %fault,
                "fault translated into failure reply"
            );
            return match (entry.failure)(message) {
                Ok(value) => self.send(ctx, entry, Output::value(value)),
                Err(err) => self.reject(HostError::BodyEncode(err.to_string())),
            };
        }

        tracing::error!(
            contract = %contract.name,
            operation = %operation.method,
            error = %fault,
            "unhandled fault"
        );
        let status = fault
            .downcast_ref::<HostError>()
            .map(HostError::status_code)
            .unwrap_or(500);
        ctx.enter(PipelineState::Sending);
        let mut response = WireResponse::new(status);
        response.set_header(FAULT_HEADER, diagnostic(fault.as_ref()));
        ctx.enter(PipelineState::Done);
        self.finish(response)
    }

    fn send(&self, ctx: &mut RequestContext<'_>, entry: &OperationEntry<C>, output: Output) -> WireResponse {
        ctx.enter(PipelineState::TranslatingResult);
        let mut response = WireResponse::new(200);
        match output.file {
            Some(file) => {
                response.set_header("Content-Type", file.content_type);
                response.set_header(
                    "Content-Disposition",
                    format!("inline; filename=\"{}\"", file.file_name.replace('"', "")),
                );
                response.body = file.bytes;
            }
            None => {
                match write_body(self.options.format, self.options.casing, output.value.clone(), entry.root) {
                    Ok(body) => {
                        response.set_header("Content-Type", self.options.format.content_type());
                        response.body = body;
                    }
                    Err(err) => return self.reject(err),
                }
            }
        }
        ctx.set_result(output.value);

        ctx.enter(PipelineState::Sending);
        let response = self.finish(response);
        ctx.enter(PipelineState::Done);
        response
    }

    /// Status and diagnostic header for a failure that is never translated.
    fn reject(&self, err: HostError) -> WireResponse {
        let mut response = WireResponse::new(err.status_code());
        response.set_header(FAULT_HEADER, diagnostic(&err));
        self.finish(response)
    }

    fn finish(&self, mut response: WireResponse) -> WireResponse {
        response.set_header(PRODUCT_HEADER, product());
        if let Some(cors) = &self.options.cors {
            for (name, value) in cors.response_headers() {
                if response.header(name).is_none() {
                    response.set_header(name, value);
                }
            }
        }
        response
    }
}

impl<C: Contract + ?Sized> Dispatcher for Pipeline<C> {
    fn contract(&self) -> &ContractDescriptor {
        self.binding.descriptor()
    }

    fn handle(&self, request: WireRequest) -> BoxFuture<'_, WireResponse> {
        Box::pin(self.process(request))
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> BoxFuture<'_, Result<Value, HostError>> {
        let method = method.to_string();
        Box::pin(async move { self.invoke_by_name(&method, args).await })
    }
}

fn overlay(
    map: &mut Map<String, Value>,
    parameter: &ParameterDescriptor,
    pairs: &[(String, String)],
) -> Result<(), HostError> {
    for (key, text) in pairs {
        if let Some(property) = parameter.find(key) {
            let value = value::decode(text, &property.kind).map_err(|e| HostError::binding(key, e))?;
            map.insert(property.name.to_string(), value);
        }
    }
    Ok(())
}

// Header-safe, single-line rendering of an error.
fn diagnostic(err: &(dyn Error + 'static)) -> String {
    let text: String = err
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_graphic() { c } else { ' ' })
        .collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
