//! Explicit implementation table used to register hosts by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binding::Dispatcher;
use crate::contract::Contract;
use crate::error::HostError;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Auxiliary interface notified when hosts of an implementation open or close.
pub trait HostLifecycle: Send + Sync {
    fn opened(&self, _address: &str) {}

    fn closed(&self, _address: &str) {}
}

type PipelineFactory =
    Arc<dyn Fn(&PipelineOptions) -> Result<Arc<dyn Dispatcher>, HostError> + Send + Sync>;

/// A contract exposed by an implementation, able to build its pipeline.
#[derive(Clone)]
pub struct ContractInterface {
    name: &'static str,
    factory: PipelineFactory,
}

impl ContractInterface {
    pub fn new<C: Contract + ?Sized>(instance: Arc<C>) -> Self {
        let factory: PipelineFactory = Arc::new(
            move |options: &PipelineOptions| -> Result<Arc<dyn Dispatcher>, HostError> {
                let pipeline = Pipeline::new(instance.clone(), options.clone())?;
                Ok(Arc::new(pipeline) as Arc<dyn Dispatcher>)
            },
        );
        Self {
            name: C::NAME,
            factory,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build a validated pipeline for this contract.
    pub fn pipeline(&self, options: &PipelineOptions) -> Result<Arc<dyn Dispatcher>, HostError> {
        (self.factory)(options)
    }
}

impl fmt::Debug for ContractInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractInterface")
            .field("name", &self.name)
            .finish()
    }
}

/// One interface an implementation exposes.
#[derive(Clone)]
pub enum Interface {
    Contract(ContractInterface),
    Lifecycle(Arc<dyn HostLifecycle>),
}

/// A named implementation and the interfaces it exposes.
#[derive(Clone)]
pub struct Implementation {
    name: String,
    interfaces: Vec<Interface>,
}

impl Implementation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interfaces: Vec::new(),
        }
    }

    /// Expose contract `C`, served by `instance`.
    pub fn contract<C: Contract + ?Sized>(mut self, instance: Arc<C>) -> Self {
        self.interfaces
            .push(Interface::Contract(ContractInterface::new(instance)));
        self
    }

    /// Expose the lifecycle events interface.
    pub fn lifecycle(mut self, lifecycle: Arc<dyn HostLifecycle>) -> Self {
        self.interfaces.push(Interface::Lifecycle(lifecycle));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub(crate) fn lifecycle_hooks(&self) -> Vec<Arc<dyn HostLifecycle>> {
        self.interfaces
            .iter()
            .filter_map(|i| match i {
                Interface::Lifecycle(l) => Some(l.clone()),
                Interface::Contract(_) => None,
            })
            .collect()
    }

    /// The contract to host.
    ///
    /// With an explicit name, the matching contract interface. Otherwise the
    /// implementation must expose exactly one interface, or two where the
    /// second is the lifecycle interface.
    pub fn resolve_contract(&self, explicit: Option<&str>) -> Result<&ContractInterface, HostError> {
        let contracts: Vec<&ContractInterface> = self
            .interfaces
            .iter()
            .filter_map(|i| match i {
                Interface::Contract(c) => Some(c),
                Interface::Lifecycle(_) => None,
            })
            .collect();

        if let Some(name) = explicit {
            return contracts
                .into_iter()
                .find(|c| c.name == name)
                .ok_or_else(|| self.ambiguous(format!("does not expose contract {}", name)));
        }

        let lifecycles = self.interfaces.len() - contracts.len();
        match (contracts.as_slice(), lifecycles) {
            ([only], 0) | ([only], 1) => Ok(*only),
            ([], _) => Err(self.ambiguous("exposes no contract".into())),
            _ => Err(self.ambiguous(format!(
                "exposes {} interfaces",
                self.interfaces.len()
            ))),
        }
    }

    fn ambiguous(&self, reason: String) -> HostError {
        HostError::ContractAmbiguous {
            implementation: self.name.clone(),
            reason,
        }
    }
}

/// Implementations available to the host manager, keyed by name.
#[derive(Clone, Default)]
pub struct ServiceCatalog {
    implementations: HashMap<String, Implementation>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implementation, replacing any with the same name.
    pub fn register(&mut self, implementation: Implementation) -> &mut Self {
        self.implementations
            .insert(implementation.name.clone(), implementation);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Implementation, HostError> {
        self.implementations
            .get(name)
            .ok_or_else(|| HostError::UnknownImplementation(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.implementations.keys().map(|s| s.as_str()).collect()
    }
}
