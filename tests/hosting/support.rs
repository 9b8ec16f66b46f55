//! Test domain: a customer service exposed as two contracts, one translating
//! faults into failure replies and one letting them through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contract_host::{
    Contract, ContractBuilder, Fault, FileResponse, ParamEnum, Parameter, ServiceResponse,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Log to the test writer; `RUST_LOG=contract_host=debug` shows pipeline states.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Region")]
    pub region: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parameter)]
#[serde(default)]
pub struct GetCustomerRequest {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetCustomerResponse {
    #[serde(rename = "Customer")]
    pub customer: Customer,
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "FailureInformation")]
    pub failure_information: String,
}

contract_host::reply_shape!(GetCustomerResponse);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ParamEnum)]
pub enum Region {
    #[default]
    North,
    South,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parameter)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(rename = "Region")]
    #[param(inline)]
    pub region: Region,
    #[serde(rename = "Name")]
    #[param(named)]
    pub name: String,
    #[serde(rename = "Page")]
    #[param(named)]
    pub page: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "Matches")]
    pub matches: Vec<Customer>,
    #[serde(rename = "Page")]
    pub page: Option<i32>,
    #[serde(flatten)]
    pub status: ServiceResponse,
}

contract_host::reply_shape!(SearchResponse, base = status);

pub trait CustomerService: Send + Sync {
    fn get_customer(&self, req: GetCustomerRequest) -> Result<GetCustomerResponse, Fault>;
    fn search(&self, req: SearchRequest) -> Result<SearchResponse, Fault>;
    fn explode(&self) -> Result<GetCustomerResponse, Fault>;
    fn export(&self) -> Result<FileResponse, Fault>;
}

/// Same operations, without fault translation.
pub trait StrictCustomerService: CustomerService {}

fn declare_operations<C>(contract: &mut ContractBuilder<C>)
where
    C: CustomerService + ?Sized + 'static,
{
    contract.operation("GetCustomer", |svc: Arc<C>, req: GetCustomerRequest| async move {
        svc.get_customer(req)
    });
    contract
        .operation("GetCustomerByUrl", |svc: Arc<C>, req: GetCustomerRequest| async move {
            svc.get_customer(req)
        })
        .get()
        .rest_name("GetCustomer");
    contract
        .operation("Search", |svc: Arc<C>, req: SearchRequest| async move { svc.search(req) })
        .get()
        .rest_name("CustomerSearch");
    contract.operation0("Explode", |svc: Arc<C>| async move { svc.explode() });
    contract
        .operation0("Export", |svc: Arc<C>| async move { svc.export() })
        .get();
}

impl Contract for dyn CustomerService {
    const NAME: &'static str = "CustomerService";

    fn declare(contract: &mut ContractBuilder<Self>) {
        contract.namespace("urn:customers").auto_handle_exceptions();
        declare_operations(contract);
    }
}

impl Contract for dyn StrictCustomerService {
    const NAME: &'static str = "StrictCustomerService";

    fn declare(contract: &mut ContractBuilder<Self>) {
        declare_operations(contract);
    }
}

/// In-memory implementation; `label` tells implementations apart.
pub struct InMemoryCustomers {
    pub label: &'static str,
    pub calls: AtomicUsize,
}

impl InMemoryCustomers {
    pub fn new(label: &'static str) -> Arc<Self> {
        Arc::new(Self {
            label,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CustomerService for InMemoryCustomers {
    fn get_customer(&self, req: GetCustomerRequest) -> Result<GetCustomerResponse, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GetCustomerResponse {
            customer: Customer {
                name: format!("{} customer {}", self.label, req.id),
                id: req.id,
                region: "North".into(),
            },
            success: true,
            failure_information: String::new(),
        })
    }

    fn search(&self, req: SearchRequest) -> Result<SearchResponse, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SearchResponse {
            matches: vec![Customer {
                id: "1".into(),
                name: req.name,
                region: format!("{:?}", req.region),
            }],
            page: req.page,
            status: ServiceResponse::default(),
        })
    }

    fn explode(&self) -> Result<GetCustomerResponse, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("customer database unavailable".into())
    }

    fn export(&self) -> Result<FileResponse, Fault> {
        Ok(FileResponse::new("text/csv", "customers.csv", "Id,Name\n1,Ada\n"))
    }
}

impl StrictCustomerService for InMemoryCustomers {}

pub fn auto(label: &'static str) -> Arc<dyn CustomerService> {
    InMemoryCustomers::new(label)
}

pub fn strict(label: &'static str) -> Arc<dyn StrictCustomerService> {
    InMemoryCustomers::new(label)
}

/// A contract whose only operation declares two parameters.
pub trait Ledger: Send + Sync {}

pub struct Books;

impl Ledger for Books {}

impl Contract for dyn Ledger {
    const NAME: &'static str = "Ledger";

    fn declare(contract: &mut ContractBuilder<Self>) {
        contract.operation_raw::<ServiceResponse, _>(
            "Transfer",
            2,
            |_svc: Arc<Self>, _args: Vec<Value>| -> BoxFuture<'static, Result<Value, Fault>> {
                Box::pin(async { Ok(Value::Null) })
            },
        );
    }
}
