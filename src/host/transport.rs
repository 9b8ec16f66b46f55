//! Transport seam between the host manager and concrete listeners.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::lock::Mutex;
use serde_json::Value;

use super::options::{ConcurrencyMode, EndpointBinding};
use crate::binding::Dispatcher;
use crate::contract::ContractDescriptor;
use crate::error::HostError;
use crate::pipeline::{WireRequest, WireResponse};

/// A parsed listen address: `scheme://authority/path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    pub scheme: String,
    pub authority: String,
    /// Root path, possibly a route template. Empty for the server root.
    pub path: String,
}

impl EndpointAddress {
    pub fn parse(address: &str) -> Result<Self, HostError> {
        let (scheme, rest) = address
            .split_once("://")
            .ok_or_else(|| HostError::UnsupportedScheme(address.to_string()))?;
        if scheme.is_empty() {
            return Err(HostError::UnsupportedScheme(address.to_string()));
        }
        let (authority, path) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: authority.to_string(),
            path: path.trim_end_matches('/').to_string(),
        })
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path)
    }
}

/// Everything a transport needs to open one endpoint.
pub struct Endpoint {
    pub address: EndpointAddress,
    pub binding: EndpointBinding,
    pub dispatcher: Arc<dyn Dispatcher>,
}

/// Opens listeners for one address scheme.
pub trait Transport: Send + Sync {
    fn scheme(&self) -> &str;

    fn open(&self, endpoint: Endpoint) -> Result<Box<dyn Listener>, HostError>;
}

/// An open endpoint. Closing is idempotent.
pub trait Listener: Send + Sync {
    /// Address the listener actually serves, after port assignment.
    fn local_address(&self) -> String;

    fn close(&mut self);
}

/// Serializes calls into a dispatcher, one at a time.
pub struct ConcurrencyGate {
    inner: Arc<dyn Dispatcher>,
    turn: Mutex<()>,
}

impl ConcurrencyGate {
    /// Apply `mode` to `inner`.
    pub fn wrap(inner: Arc<dyn Dispatcher>, mode: ConcurrencyMode) -> Arc<dyn Dispatcher> {
        match mode {
            ConcurrencyMode::Multiple => inner,
            ConcurrencyMode::Single => Arc::new(Self {
                inner,
                turn: Mutex::new(()),
            }),
        }
    }
}

impl Dispatcher for ConcurrencyGate {
    fn contract(&self) -> &ContractDescriptor {
        self.inner.contract()
    }

    fn handle(&self, request: WireRequest) -> BoxFuture<'_, WireResponse> {
        Box::pin(async move {
            let _turn = self.turn.lock().await;
            self.inner.handle(request).await
        })
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> BoxFuture<'_, Result<Value, HostError>> {
        let method = method.to_string();
        Box::pin(async move {
            let _turn = self.turn.lock().await;
            self.inner.invoke(&method, args).await
        })
    }
}
