//! In-process transport: hosts published by address, called by method name.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::transport::{Endpoint, EndpointAddress, Listener, Transport};
use crate::binding::Dispatcher;
use crate::error::HostError;
use crate::pipeline::{WireRequest, WireResponse};

/// Scheme served by [`InProcessTransport`].
pub const IN_PROCESS_SCHEME: &str = "inproc";

/// Address book of in-process hosts.
#[derive(Default)]
pub struct InProcessDirectory {
    endpoints: RwLock<HashMap<String, Arc<dyn Dispatcher>>>,
}

impl InProcessDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a channel to the host at `address`.
    pub fn connect(self: &Arc<Self>, address: &str) -> Result<InProcessChannel, HostError> {
        let address = directory_key(address);
        self.lookup(&address)?;
        Ok(InProcessChannel {
            directory: self.clone(),
            address,
        })
    }

    /// Published addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        addresses.sort();
        addresses
    }

    fn lookup(&self, address: &str) -> Result<Arc<dyn Dispatcher>, HostError> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
            .ok_or_else(|| HostError::EndpointNotFound(address.to_string()))
    }

    fn publish(&self, address: &str, dispatcher: Arc<dyn Dispatcher>) {
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string(), dispatcher);
    }

    // Only withdraws the dispatcher this listener published.
    fn withdraw(&self, address: &str, dispatcher: &Arc<dyn Dispatcher>) {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let published = endpoints
            .get(address)
            .is_some_and(|current| same_dispatcher(current, dispatcher));
        if published {
            endpoints.remove(address);
        }
    }
}

// Addresses are published in their normalized form.
fn directory_key(address: &str) -> String {
    EndpointAddress::parse(address)
        .map(|a| a.to_string())
        .unwrap_or_else(|_| address.to_string())
}

fn same_dispatcher(a: &Arc<dyn Dispatcher>, b: &Arc<dyn Dispatcher>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Client side of an in-process host.
///
/// Every call looks the address up again, so calls after the host closed
/// fail with `EndpointNotFound` and calls after a replacement reach the new
/// host.
#[derive(Clone)]
pub struct InProcessChannel {
    directory: Arc<InProcessDirectory>,
    address: String,
}

impl InProcessChannel {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Invoke `method` with a parameter array.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, HostError> {
        let dispatcher = self.directory.lookup(&self.address)?;
        dispatcher.invoke(method, args).await
    }

    /// Typed call with one parameter object.
    pub async fn call<P, R>(&self, method: &str, parameter: &P) -> Result<R, HostError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let arg = serde_json::to_value(parameter).map_err(|e| HostError::BodyEncode(e.to_string()))?;
        let value = self.invoke(method, vec![arg]).await?;
        serde_json::from_value(value).map_err(HostError::from)
    }

    /// Typed call without parameters.
    pub async fn call0<R: DeserializeOwned>(&self, method: &str) -> Result<R, HostError> {
        let value = self.invoke(method, Vec::new()).await?;
        serde_json::from_value(value).map_err(HostError::from)
    }

    /// Run a wire request through the host's pipeline.
    pub async fn send(&self, request: WireRequest) -> Result<WireResponse, HostError> {
        let dispatcher = self.directory.lookup(&self.address)?;
        Ok(dispatcher.handle(request).await)
    }
}

/// Publishes hosts into an [`InProcessDirectory`].
pub struct InProcessTransport {
    directory: Arc<InProcessDirectory>,
}

impl InProcessTransport {
    pub fn new(directory: Arc<InProcessDirectory>) -> Self {
        Self { directory }
    }
}

impl Transport for InProcessTransport {
    fn scheme(&self) -> &str {
        IN_PROCESS_SCHEME
    }

    fn open(&self, endpoint: Endpoint) -> Result<Box<dyn Listener>, HostError> {
        let address = endpoint.address.to_string();
        self.directory.publish(&address, endpoint.dispatcher.clone());
        Ok(Box::new(InProcessListener {
            directory: self.directory.clone(),
            address,
            dispatcher: endpoint.dispatcher,
            open: true,
        }))
    }
}

struct InProcessListener {
    directory: Arc<InProcessDirectory>,
    address: String,
    dispatcher: Arc<dyn Dispatcher>,
    open: bool,
}

impl Listener for InProcessListener {
    fn local_address(&self) -> String {
        self.address.clone()
    }

    fn close(&mut self) {
        if self.open {
            self.directory.withdraw(&self.address, &self.dispatcher);
            self.open = false;
        }
    }
}
