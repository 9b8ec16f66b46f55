//! Parameter binding: casing, partial bodies and body-only properties.

use std::sync::Arc;

use contract_host::{
    Casing, Contract, ContractBuilder, Fault, Parameter, Pipeline, PipelineOptions,
    ServiceResponse, WireRequest,
};
use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// No `#[serde(default)]`: members missing from a body must still bind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Parameter)]
pub struct OpenAccount {
    #[serde(rename = "CustomerId")]
    #[param(inline)]
    pub customer_id: String,
    #[param(named)]
    pub page_size: i32,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parameter)]
pub struct TagAccount {
    #[serde(rename = "Id")]
    pub id: String,
    #[param(skip)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountReply {
    pub customer_id: String,
    pub page_size: i32,
    pub note: String,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub status: ServiceResponse,
}

contract_host::reply_shape!(AccountReply, base = status);

pub trait Accounts: Send + Sync {}

struct Bank;

impl Accounts for Bank {}

fn opened(req: OpenAccount) -> Result<AccountReply, Fault> {
    Ok(AccountReply {
        customer_id: req.customer_id,
        page_size: req.page_size,
        note: req.note,
        ..AccountReply::default()
    })
}

impl Contract for dyn Accounts {
    const NAME: &'static str = "Accounts";

    fn declare(contract: &mut ContractBuilder<Self>) {
        contract.operation("Open", |_svc: Arc<Self>, req: OpenAccount| async move { opened(req) });
        contract
            .operation("OpenByUrl", |_svc: Arc<Self>, req: OpenAccount| async move { opened(req) })
            .get()
            .rest_name("Open");
        contract
            .operation("Tag", |_svc: Arc<Self>, req: TagAccount| async move {
                Ok::<_, Fault>(AccountReply {
                    customer_id: req.id,
                    tags: req.tags,
                    ..AccountReply::default()
                })
            })
            .get();
    }
}

fn pipeline(casing: Casing) -> Pipeline<dyn Accounts> {
    crate::support::init_tracing();
    let bank: Arc<dyn Accounts> = Arc::new(Bank);
    Pipeline::new(bank, PipelineOptions::default().casing(casing)).unwrap()
}

#[test]
fn camel_case_body_binds_multi_word_properties() {
    let response = block_on(pipeline(Casing::CamelCase).process(
        WireRequest::new("POST", "/Open").with_body(r#"{"customerId":"5","pageSize":7}"#),
    ));

    assert_eq!(response.status, 200);
    let body: Value = response.json().unwrap();
    assert_eq!(body["customerId"], json!("5"));
    assert_eq!(body["pageSize"], json!(7));
    assert_eq!(body["note"], json!(""));
}

#[test]
fn camel_case_query_binds_snake_case_field() {
    let response = block_on(
        pipeline(Casing::CamelCase).process(WireRequest::new("GET", "/Open/5?pageSize=9")),
    );

    assert_eq!(response.status, 200);
    let body: Value = response.json().unwrap();
    assert_eq!(body["customerId"], json!("5"));
    assert_eq!(body["pageSize"], json!(9));
}

#[test]
fn partial_body_keeps_defaults_for_missing_members() {
    let response = block_on(pipeline(Casing::Declared).process(
        WireRequest::new("POST", "/Open?page_size=3").with_body(r#"{"CustomerId":"1"}"#),
    ));

    assert_eq!(response.status, 200);
    let reply: AccountReply = response.json().unwrap();
    assert_eq!(reply.customer_id, "1");
    assert_eq!(reply.note, "");
    assert_eq!(reply.page_size, 3);
}

#[test]
fn mistyped_body_member_is_still_rejected() {
    let response = block_on(pipeline(Casing::Declared).process(
        WireRequest::new("POST", "/Open").with_body(r#"{"page_size":"many"}"#),
    ));
    assert_eq!(response.status, 400);
}

#[test]
fn skipped_field_keeps_sibling_body_only() {
    assert_eq!(TagAccount::properties().len(), 2);

    // Two properties, neither pinned: the path segment binds nothing.
    let response = block_on(pipeline(Casing::Declared).process(WireRequest::new("GET", "/Tag/42")));
    assert_eq!(response.status, 200);
    let reply: AccountReply = response.json().unwrap();
    assert_eq!(reply.customer_id, "");
}

#[test]
fn skipped_field_still_takes_query_values() {
    let response = block_on(pipeline(Casing::Declared).process(WireRequest::new(
        "GET",
        "/Tag?Id=7&tags=%5B%22gold%22%2C%22vip%22%5D",
    )));

    assert_eq!(response.status, 200);
    let reply: AccountReply = response.json().unwrap();
    assert_eq!(reply.customer_id, "7");
    assert_eq!(reply.tags, vec!["gold".to_string(), "vip".to_string()]);
}
