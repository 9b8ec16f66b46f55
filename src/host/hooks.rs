//! Extensibility hooks fired while hosts are registered.

use std::sync::Arc;

use super::options::{EndpointBinding, HostOptions};
use super::registry::HostInfo;

/// Fired before a host is created. Handlers may rewrite the address or options.
#[derive(Debug, Clone)]
pub struct HostAddingEvent {
    pub contract: String,
    pub implementation: String,
    pub address: String,
    pub options: HostOptions,
}

/// Fired before an endpoint is opened. Handlers may rewrite the address or binding.
#[derive(Debug, Clone)]
pub struct EndpointAddingEvent {
    pub contract: String,
    pub address: String,
    pub binding: EndpointBinding,
}

type HostAddingHook = Arc<dyn Fn(&mut HostAddingEvent) + Send + Sync>;
type EndpointAddingHook = Arc<dyn Fn(&mut EndpointAddingEvent) + Send + Sync>;
type LaunchedHook = Arc<dyn Fn(&HostInfo) + Send + Sync>;

/// Registered hooks, run in registration order.
#[derive(Clone, Default)]
pub struct HostHooks {
    host_adding: Vec<HostAddingHook>,
    endpoint_adding: Vec<EndpointAddingHook>,
    launched: Vec<LaunchedHook>,
}

impl HostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_host_adding<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HostAddingEvent) + Send + Sync + 'static,
    {
        self.host_adding.push(Arc::new(hook));
        self
    }

    pub fn on_endpoint_adding<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut EndpointAddingEvent) + Send + Sync + 'static,
    {
        self.endpoint_adding.push(Arc::new(hook));
        self
    }

    /// Notified after a host opened, off the registering thread.
    pub fn on_launched<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HostInfo) + Send + Sync + 'static,
    {
        self.launched.push(Arc::new(hook));
        self
    }

    pub(crate) fn host_adding(&self, event: &mut HostAddingEvent) {
        for hook in &self.host_adding {
            hook(event);
        }
    }

    pub(crate) fn endpoint_adding(&self, event: &mut EndpointAddingEvent) {
        for hook in &self.endpoint_adding {
            hook(event);
        }
    }

    /// Fire-and-forget: never blocks the caller.
    pub(crate) fn launched(&self, info: HostInfo) {
        if self.launched.is_empty() {
            return;
        }
        let hooks = self.launched.clone();
        std::thread::spawn(move || {
            for hook in hooks {
                hook(&info);
            }
        });
    }
}
