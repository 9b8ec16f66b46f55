//! Host manager: replacement, hooks, lifecycle and registration errors.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use contract_host::{
    BindingStyle, ConcurrencyMode, HostError, HostHooks, HostLifecycle, HostManager, HostOptions,
    HostSelector, Implementation, InProcessDirectory, MessageSize, ServiceCatalog, WireRequest,
};
use futures::executor::block_on;

use crate::support::{auto, Books, CustomerService, GetCustomerResponse, InMemoryCustomers, Ledger};

#[derive(Default)]
struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl HostLifecycle for Journal {
    fn opened(&self, address: &str) {
        self.events.lock().unwrap().push(format!("opened {address}"));
    }

    fn closed(&self, address: &str) {
        self.events.lock().unwrap().push(format!("closed {address}"));
    }
}

fn catalog(journal: Arc<Journal>) -> ServiceCatalog {
    crate::support::init_tracing();
    let mut catalog = ServiceCatalog::new();
    catalog
        .register(
            Implementation::new("alpha")
                .contract(auto("alpha"))
                .lifecycle(journal),
        )
        .register(Implementation::new("beta").contract(auto("beta")));
    catalog
}

fn customer_name(directory: &Arc<InProcessDirectory>, address: &str) -> String {
    let channel = directory.connect(address).unwrap();
    let reply: GetCustomerResponse = block_on(channel.call(
        "GetCustomer",
        &crate::support::GetCustomerRequest { id: "1".into() },
    ))
    .unwrap();
    reply.customer.name
}

#[test]
fn re_registering_an_address_replaces_the_host() {
    let journal = Arc::new(Journal::default());
    let directory = InProcessDirectory::new();
    let manager = HostManager::new(catalog(journal.clone())).with_in_process(directory.clone());

    let first = manager
        .register_host("alpha", None, "inproc://customers", HostOptions::default())
        .unwrap();
    assert_eq!(customer_name(&directory, "inproc://customers"), "alpha customer 1");

    let second = manager
        .register_host("beta", None, "inproc://customers", HostOptions::default())
        .unwrap();

    assert!(!first.is_open());
    assert!(second.is_open());
    let hosts = manager.hosts().unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].implementation, "beta");
    assert_eq!(directory.addresses().len(), 1);
    assert_eq!(customer_name(&directory, "inproc://customers"), "beta customer 1");
    assert_eq!(
        journal.events(),
        vec!["opened inproc://customers", "closed inproc://customers"]
    );
}

#[test]
fn stop_host_by_address_and_contract() {
    let directory = InProcessDirectory::new();
    let manager = HostManager::new(catalog(Arc::new(Journal::default())))
        .with_in_process(directory.clone());
    for address in ["inproc://a", "inproc://b", "inproc://c"] {
        manager
            .register_host("beta", None, address, HostOptions::default())
            .unwrap();
    }

    assert_eq!(
        manager
            .stop_host(HostSelector::Address("inproc://a/".into()))
            .unwrap(),
        1
    );
    assert_eq!(
        manager
            .stop_host(HostSelector::Contract("CustomerService".into()))
            .unwrap(),
        2
    );
    assert!(manager.hosts().unwrap().is_empty());
    assert_eq!(manager.stop_all().unwrap(), 0);
}

#[test]
fn hooks_rewrite_address_and_binding() {
    let (launched_tx, launched_rx) = mpsc::channel();
    let launched_tx = Mutex::new(launched_tx);
    let hooks = HostHooks::new()
        .on_host_adding(|event| {
            event.address = format!("{}-v2", event.address);
            event.options.message_size = MessageSize::Large;
        })
        .on_endpoint_adding(|event| {
            event.binding.concurrency = ConcurrencyMode::Single;
        })
        .on_launched(move |info| {
            let _ = launched_tx.lock().unwrap().send(info.clone());
        });

    let directory = InProcessDirectory::new();
    let manager = HostManager::new(catalog(Arc::new(Journal::default())))
        .with_in_process(directory.clone())
        .with_hooks(hooks);
    let handle = manager
        .register_host("beta", None, "inproc://customers", HostOptions::default())
        .unwrap();

    assert_eq!(handle.address(), "inproc://customers-v2");
    assert_eq!(handle.info().binding.message_size, MessageSize::Large);
    assert_eq!(handle.info().binding.max_message_bytes, MessageSize::Large.max_bytes());
    assert_eq!(handle.info().binding.concurrency, ConcurrencyMode::Single);
    assert_eq!(customer_name(&directory, "inproc://customers-v2"), "beta customer 1");

    let launched = launched_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(launched.address, "inproc://customers-v2");
    assert_eq!(launched.contract, "CustomerService");
}

#[test]
fn action_binding_dispatches_by_action_name() {
    let directory = InProcessDirectory::new();
    let manager = HostManager::new(catalog(Arc::new(Journal::default())))
        .with_in_process(directory.clone());
    manager
        .register_host(
            "beta",
            None,
            "inproc://soap",
            HostOptions::default().binding(BindingStyle::Action),
        )
        .unwrap();

    let channel = directory.connect("inproc://soap").unwrap();
    let response = block_on(channel.send(
        WireRequest::new("POST", "/")
            .with_header("SOAPAction", "\"urn:customers/CustomerService/GetCustomer\"")
            .with_body(r#"{"Id":"3"}"#),
    ))
    .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json::<GetCustomerResponse>().unwrap().customer.id, "3");

    let response = block_on(channel.send(WireRequest::new("GET", "/GetCustomer"))).unwrap();
    assert_eq!(response.status, 404);
}

#[test]
fn direct_registration_skips_the_catalog() {
    let directory = InProcessDirectory::new();
    let manager = HostManager::new(ServiceCatalog::new()).with_in_process(directory.clone());
    let customers = InMemoryCustomers::new("direct");
    let instance: Arc<dyn CustomerService> = customers.clone();
    let handle = manager
        .register(instance, "inproc://direct", HostOptions::default())
        .unwrap();

    assert_eq!(handle.contract(), "CustomerService");
    assert_eq!(handle.listen_address(), "inproc://direct");
    assert_eq!(customer_name(&directory, "inproc://direct"), "direct customer 1");
    assert_eq!(customers.calls(), 1);
}

#[test]
fn registration_errors() {
    let directory = InProcessDirectory::new();
    let mut catalog = catalog(Arc::new(Journal::default()));
    catalog
        .register(
            Implementation::new("both")
                .contract(auto("both"))
                .contract(crate::support::strict("both")),
        )
        .register(Implementation::new("ledger").contract(Arc::new(Books) as Arc<dyn Ledger>));
    let manager = HostManager::new(catalog).with_in_process(directory.clone());

    let err = manager
        .register_host("missing", None, "inproc://x", HostOptions::default())
        .unwrap_err();
    assert!(matches!(err, HostError::UnknownImplementation(_)));

    let err = manager
        .register_host("both", None, "inproc://x", HostOptions::default())
        .unwrap_err();
    assert!(matches!(err, HostError::ContractAmbiguous { .. }));
    manager
        .register_host("both", Some("StrictCustomerService"), "inproc://x", HostOptions::default())
        .unwrap();

    let err = manager
        .register_host("ledger", None, "inproc://ledger", HostOptions::default())
        .unwrap_err();
    assert!(matches!(err, HostError::TooManyParameters { count: 2, .. }));

    let err = manager
        .register_host("beta", None, "tcp://127.0.0.1:9", HostOptions::default())
        .unwrap_err();
    assert!(matches!(err, HostError::UnsupportedScheme(_)));

    assert_eq!(manager.hosts().unwrap().len(), 1);
}

#[test]
fn dropping_the_manager_closes_hosts() {
    let journal = Arc::new(Journal::default());
    let directory = InProcessDirectory::new();
    {
        let manager = HostManager::new(catalog(journal.clone())).with_in_process(directory.clone());
        manager
            .register_host("alpha", None, "inproc://customers", HostOptions::default())
            .unwrap();
    }
    assert!(directory.addresses().is_empty());
    assert_eq!(journal.events().last().unwrap(), "closed inproc://customers");
}

/// Reads the registry from inside its own callbacks.
#[derive(Default)]
struct HostCounter {
    manager: OnceLock<Weak<HostManager>>,
    seen: Mutex<Vec<usize>>,
}

impl HostCounter {
    fn record(&self) {
        if let Some(manager) = self.manager.get().and_then(Weak::upgrade) {
            let count = manager.hosts().unwrap().len();
            self.seen.lock().unwrap().push(count);
        }
    }
}

impl HostLifecycle for HostCounter {
    fn opened(&self, _address: &str) {
        self.record();
    }

    fn closed(&self, _address: &str) {
        self.record();
    }
}

#[test]
fn lifecycle_callbacks_can_use_the_manager() {
    crate::support::init_tracing();
    let counter = Arc::new(HostCounter::default());
    let mut catalog = ServiceCatalog::new();
    catalog.register(
        Implementation::new("watched")
            .contract(auto("watched"))
            .lifecycle(counter.clone()),
    );
    let manager = Arc::new(HostManager::new(catalog).with_in_process(InProcessDirectory::new()));
    let _ = counter.manager.set(Arc::downgrade(&manager));

    manager
        .register_host("watched", None, "inproc://watched", HostOptions::default())
        .unwrap();
    manager
        .register_host("watched", None, "inproc://watched", HostOptions::default())
        .unwrap();
    assert_eq!(
        manager
            .stop_host(HostSelector::Address("inproc://watched".into()))
            .unwrap(),
        1
    );

    // open, then replace (close + open), then stop.
    assert_eq!(*counter.seen.lock().unwrap(), vec![1, 1, 1, 0]);
}
