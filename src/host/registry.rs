//! Host manager: the registry of active hosts, keyed by full address.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::catalog::{ContractInterface, HostLifecycle, ServiceCatalog};
use super::hooks::{EndpointAddingEvent, HostAddingEvent, HostHooks};
use super::in_process::{InProcessDirectory, InProcessTransport};
use super::options::{EndpointBinding, HostOptions};
use super::transport::{ConcurrencyGate, Endpoint, EndpointAddress, Listener, Transport};
use crate::contract::Contract;
use crate::error::HostError;

/// Snapshot of one registered host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Registry key: the normalized full address.
    pub address: String,
    /// Address the transport actually listens on.
    pub listen_address: String,
    pub contract: String,
    pub implementation: String,
    pub binding: EndpointBinding,
}

/// Caller's view of a registered host.
#[derive(Debug, Clone)]
pub struct HostHandle {
    info: HostInfo,
    open: Arc<AtomicBool>,
}

impl HostHandle {
    pub fn address(&self) -> &str {
        &self.info.address
    }

    pub fn listen_address(&self) -> &str {
        &self.info.listen_address
    }

    pub fn contract(&self) -> &str {
        &self.info.contract
    }

    pub fn info(&self) -> &HostInfo {
        &self.info
    }

    /// False once the host was stopped or replaced.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Which hosts to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSelector {
    Address(String),
    Contract(String),
}

struct HostEntry {
    info: HostInfo,
    listener: Box<dyn Listener>,
    lifecycle: Vec<Arc<dyn HostLifecycle>>,
    open: Arc<AtomicBool>,
}

impl HostEntry {
    /// Release the listener. Lifecycle callbacks run later, through
    /// [`ClosedHost::notify`], once the registry lock is released.
    fn close(mut self) -> ClosedHost {
        self.listener.close();
        self.open.store(false, Ordering::SeqCst);
        ClosedHost {
            info: self.info,
            lifecycle: self.lifecycle,
        }
    }
}

struct ClosedHost {
    info: HostInfo,
    lifecycle: Vec<Arc<dyn HostLifecycle>>,
}

impl ClosedHost {
    fn notify(self) {
        for lifecycle in &self.lifecycle {
            lifecycle.closed(&self.info.address);
        }
        tracing::info!(
            address = %self.info.address,
            contract = %self.info.contract,
            "host closed"
        );
    }
}

/// Registers, replaces and stops hosts.
///
/// ## Example
///
/// ```ignore
/// let directory = InProcessDirectory::new();
/// let manager = HostManager::new(catalog).with_in_process(directory.clone());
///
/// manager.register_host("customers", None, "inproc://customers", HostOptions::default())?;
/// let customer: GetCustomerResponse = directory
///     .connect("inproc://customers")?
///     .call("GetCustomer", &GetCustomerRequest { id: "42".into() })
///     .await?;
///
/// manager.stop_all()?;
/// ```
pub struct HostManager {
    catalog: ServiceCatalog,
    transports: HashMap<String, Arc<dyn Transport>>,
    hooks: HostHooks,
    hosts: Mutex<HashMap<String, HostEntry>>,
}

impl HostManager {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self {
            catalog,
            transports: HashMap::new(),
            hooks: HostHooks::default(),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Serve addresses with the transport's scheme.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports
            .insert(transport.scheme().to_ascii_lowercase(), transport);
        self
    }

    /// Serve `inproc://` addresses through `directory`.
    pub fn with_in_process(self, directory: Arc<InProcessDirectory>) -> Self {
        self.with_transport(Arc::new(InProcessTransport::new(directory)))
    }

    pub fn with_hooks(mut self, hooks: HostHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Host a catalog implementation at `address`.
    ///
    /// `contract` names the contract when the implementation exposes more
    /// than one. An existing host at the same address is closed first.
    pub fn register_host(
        &self,
        implementation: &str,
        contract: Option<&str>,
        address: &str,
        options: HostOptions,
    ) -> Result<HostHandle, HostError> {
        let implementation = self.catalog.get(implementation)?;
        let interface = implementation.resolve_contract(contract)?;
        self.open_host(
            interface,
            implementation.name(),
            implementation.lifecycle_hooks(),
            address,
            options,
        )
    }

    /// Host a contract instance directly, bypassing the catalog.
    pub fn register<C: Contract + ?Sized>(
        &self,
        instance: Arc<C>,
        address: &str,
        options: HostOptions,
    ) -> Result<HostHandle, HostError> {
        let interface = ContractInterface::new(instance);
        self.open_host(&interface, C::NAME, Vec::new(), address, options)
    }

    fn open_host(
        &self,
        interface: &ContractInterface,
        implementation: &str,
        lifecycle: Vec<Arc<dyn HostLifecycle>>,
        address: &str,
        options: HostOptions,
    ) -> Result<HostHandle, HostError> {
        let mut adding = HostAddingEvent {
            contract: interface.name().to_string(),
            implementation: implementation.to_string(),
            address: address.to_string(),
            options,
        };
        self.hooks.host_adding(&mut adding);
        let HostAddingEvent {
            address,
            mut options,
            ..
        } = adding;

        let mut endpoint = EndpointAddingEvent {
            contract: interface.name().to_string(),
            address,
            binding: options.endpoint_binding(),
        };
        self.hooks.endpoint_adding(&mut endpoint);
        let EndpointAddingEvent { address, binding, .. } = endpoint;
        options.pipeline.dispatch = binding.style.dispatch_mode();
        options.pipeline.format = binding.format;

        let address = EndpointAddress::parse(&address)?;
        let transport = self
            .transports
            .get(&address.scheme)
            .cloned()
            .ok_or_else(|| HostError::UnsupportedScheme(address.to_string()))?;
        let dispatcher = ConcurrencyGate::wrap(interface.pipeline(&options.pipeline)?, binding.concurrency);
        let key = address.to_string();

        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| HostError::LockPoisoned("register host"))?;
        let replaced = hosts.remove(&key).map(|previous| {
            tracing::info!(address = %key, "replacing registered host");
            previous.close()
        });

        let opened = transport.open(Endpoint {
            address,
            binding: binding.clone(),
            dispatcher,
        });
        let listener = match opened {
            Ok(listener) => listener,
            Err(err) => {
                drop(hosts);
                replaced.into_iter().for_each(ClosedHost::notify);
                return Err(err);
            }
        };
        let info = HostInfo {
            address: key.clone(),
            listen_address: listener.local_address(),
            contract: interface.name().to_string(),
            implementation: implementation.to_string(),
            binding,
        };
        let open = Arc::new(AtomicBool::new(true));
        hosts.insert(
            key,
            HostEntry {
                info: info.clone(),
                listener,
                lifecycle: lifecycle.clone(),
                open: open.clone(),
            },
        );
        drop(hosts);

        replaced.into_iter().for_each(ClosedHost::notify);
        for hook in &lifecycle {
            hook.opened(&info.address);
        }

        tracing::info!(
            address = %info.address,
            listen_address = %info.listen_address,
            contract = %info.contract,
            implementation = %info.implementation,
            "host opened"
        );
        self.hooks.launched(info.clone());
        Ok(HostHandle { info, open })
    }

    /// Stop the hosts matching `selector`. Returns how many were closed.
    pub fn stop_host(&self, selector: HostSelector) -> Result<usize, HostError> {
        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| HostError::LockPoisoned("stop host"))?;
        let keys: Vec<String> = hosts
            .iter()
            .filter(|(key, entry)| match &selector {
                HostSelector::Address(address) => {
                    let normalized = EndpointAddress::parse(address)
                        .map(|a| a.to_string())
                        .unwrap_or_else(|_| address.clone());
                    **key == normalized
                }
                HostSelector::Contract(contract) => entry.info.contract == *contract,
            })
            .map(|(key, _)| key.clone())
            .collect();
        let closed: Vec<ClosedHost> = keys
            .iter()
            .filter_map(|key| hosts.remove(key))
            .map(HostEntry::close)
            .collect();
        drop(hosts);

        closed.into_iter().for_each(ClosedHost::notify);
        Ok(keys.len())
    }

    /// Stop every host. Returns how many were closed.
    pub fn stop_all(&self) -> Result<usize, HostError> {
        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| HostError::LockPoisoned("stop all"))?;
        let closed: Vec<ClosedHost> = hosts.drain().map(|(_, entry)| entry.close()).collect();
        drop(hosts);

        let count = closed.len();
        closed.into_iter().for_each(ClosedHost::notify);
        Ok(count)
    }

    /// Alive hosts, sorted by address.
    pub fn hosts(&self) -> Result<Vec<HostInfo>, HostError> {
        let hosts = self
            .hosts
            .lock()
            .map_err(|_| HostError::LockPoisoned("list hosts"))?;
        let mut infos: Vec<HostInfo> = hosts.values().map(|e| e.info.clone()).collect();
        infos.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(infos)
    }
}

impl Drop for HostManager {
    fn drop(&mut self) {
        let hosts = self.hosts.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in hosts.drain() {
            entry.close().notify();
        }
    }
}
