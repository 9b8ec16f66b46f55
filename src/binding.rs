//! Table-driven service binding.
//!
//! A `ServiceBinding` pairs a live contract instance with its cached operation
//! table, and dispatches calls by operation index or method name plus a
//! parameter array. Hosts see every contract through the object-safe
//! [`Dispatcher`] trait.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::contract::{self, Contract, ContractDescriptor, ContractTable, Invocation, OperationEntry};
use crate::error::HostError;
use crate::pipeline::{WireRequest, WireResponse};

/// Object-safe entry point into a hosted contract.
pub trait Dispatcher: Send + Sync {
    /// Description of the hosted contract.
    fn contract(&self) -> &ContractDescriptor;

    /// Run one wire request through the request pipeline.
    fn handle(&self, request: WireRequest) -> BoxFuture<'_, WireResponse>;

    /// Invoke an operation by method name with a parameter array.
    ///
    /// Faults are translated with the same policy as wire requests.
    fn invoke(&self, method: &str, args: Vec<Value>) -> BoxFuture<'_, Result<Value, HostError>>;
}

/// A contract instance bound to its operation table.
pub struct ServiceBinding<C: Contract + ?Sized> {
    instance: Arc<C>,
    table: Arc<ContractTable<C>>,
}

impl<C: Contract + ?Sized> Clone for ServiceBinding<C> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            table: self.table.clone(),
        }
    }
}

impl<C: Contract + ?Sized> ServiceBinding<C> {
    pub fn new(instance: Arc<C>) -> Self {
        Self {
            instance,
            table: contract::table::<C>(),
        }
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.table.descriptor
    }

    pub fn instance(&self) -> &Arc<C> {
        &self.instance
    }

    pub(crate) fn entry(&self, index: usize) -> Option<&OperationEntry<C>> {
        self.table.entries.get(index)
    }

    /// Call operation `index`. Failures come back wrapped once in
    /// [`InvocationError`](crate::InvocationError).
    pub(crate) fn invoke(&self, index: usize, args: Vec<Value>) -> Option<Invocation> {
        self.entry(index)
            .map(|entry| (entry.invoke)(self.instance.clone(), args))
    }
}
