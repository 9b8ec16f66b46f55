//! End-to-end pipeline behavior over wire requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contract_host::pipeline::{FAULT_HEADER, PRODUCT_HEADER};
use contract_host::{
    Casing, CorsPolicy, Pipeline, PipelineOptions, RequestContext, WireFormat, WireRequest,
};
use futures::executor::block_on;
use serde_json::Value;

use crate::support::{auto, strict, CustomerService, GetCustomerResponse, SearchResponse, StrictCustomerService};

fn auto_pipeline(options: PipelineOptions) -> Pipeline<dyn CustomerService> {
    crate::support::init_tracing();
    Pipeline::new(auto("alpha"), options).unwrap()
}

fn strict_pipeline(options: PipelineOptions) -> Pipeline<dyn StrictCustomerService> {
    Pipeline::new(strict("alpha"), options).unwrap()
}

#[test]
fn post_body_binds_parameter() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(
        WireRequest::new("POST", "/GetCustomer").with_body(r#"{"id":"42"}"#),
    ));

    assert_eq!(response.status, 200);
    let reply: GetCustomerResponse = response.json().unwrap();
    assert_eq!(reply.customer.id, "42");
    assert!(reply.success);
    assert!(response.header(PRODUCT_HEADER).is_some());
}

#[test]
fn get_binds_inline_segment_over_default_parameter() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/GetCustomer/42")));

    assert_eq!(response.status, 200);
    let reply: GetCustomerResponse = response.json().unwrap();
    assert_eq!(reply.customer.id, "42");
}

#[test]
fn operation_names_ignore_case() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/getcustomer/7")));
    assert_eq!(response.json::<GetCustomerResponse>().unwrap().customer.id, "7");
}

#[test]
fn auto_handled_fault_is_a_failure_reply() {
    let pipeline = auto_pipeline(PipelineOptions::default().casing(Casing::CamelCase));
    let response = block_on(pipeline.process(WireRequest::new("POST", "/Explode")));

    assert_eq!(response.status, 200);
    let body: Value = response.json().unwrap();
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(
        body["failureInformation"],
        Value::from("Generic error in CustomerService::Explode")
    );
    assert!(response.header(FAULT_HEADER).is_none());
}

#[test]
fn verbose_failure_carries_the_cause() {
    let pipeline = auto_pipeline(PipelineOptions::default().verbose_errors(true));
    let response = block_on(pipeline.process(WireRequest::new("POST", "/Explode")));

    let reply: GetCustomerResponse = response.json().unwrap();
    assert!(!reply.success);
    assert!(reply.failure_information.contains("customer database unavailable"));
    assert!(reply.failure_information.starts_with("Message:"));
}

#[test]
fn unhandled_fault_is_a_bare_500() {
    let pipeline = strict_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("POST", "/Explode")));

    assert_eq!(response.status, 500);
    assert!(response.body.is_empty());
    let diagnostic = response.header(FAULT_HEADER).unwrap();
    assert!(diagnostic.contains("customer database unavailable"));
}

#[test]
fn preflight_short_circuits_authorization() {
    let checks = Arc::new(AtomicUsize::new(0));
    let seen = checks.clone();
    let pipeline = auto_pipeline(
        PipelineOptions::default()
            .cors(CorsPolicy::default())
            .authorizer(move |_ctx: &RequestContext<'_>| {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            }),
    );

    let response = block_on(pipeline.process(WireRequest::new("OPTIONS", "/GetCustomer")));
    assert_eq!(response.status, 204);
    assert!(response.header("Access-Control-Allow-Methods").is_some());
    assert_eq!(checks.load(Ordering::SeqCst), 0);

    let response = block_on(pipeline.process(
        WireRequest::new("POST", "/GetCustomer").with_body(r#"{"Id":"1"}"#),
    ));
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(checks.load(Ordering::SeqCst), 1);
}

#[test]
fn rejected_authorization_is_401() {
    let pipeline = auto_pipeline(
        PipelineOptions::default().authorizer(|ctx: &RequestContext<'_>| ctx.identity().is_authenticated()),
    );
    let response = block_on(pipeline.process(WireRequest::new("GET", "/GetCustomer/1")));
    assert_eq!(response.status, 401);
    assert!(response.body.is_empty());
}

#[test]
fn route_values_override_query_values() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let request = WireRequest::new("GET", "/CustomerSearch/South?Name=query&Page=2")
        .with_route_value("name", "route");
    let reply: SearchResponse = block_on(pipeline.process(request)).json().unwrap();

    assert_eq!(reply.matches[0].name, "route");
    assert_eq!(reply.matches[0].region, "South");
    assert_eq!(reply.page, Some(2));
}

#[test]
fn nullable_query_value_accepts_null() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let reply: SearchResponse = block_on(
        pipeline.process(WireRequest::new("GET", "/CustomerSearch/North?Page=null")),
    )
    .json()
    .unwrap();
    assert_eq!(reply.page, None);
}

#[test]
fn bad_query_value_names_the_key() {
    let pipeline = strict_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/CustomerSearch/North?Page=two")));

    assert_eq!(response.status, 400);
    assert!(response.header(FAULT_HEADER).unwrap().contains("Page"));
}

#[test]
fn unknown_enum_member_fails_binding() {
    let pipeline = strict_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/CustomerSearch/north")));
    assert_eq!(response.status, 400);
}

#[test]
fn unknown_operation_is_404() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/Nothing")));
    assert_eq!(response.status, 404);

    // GetCustomer over PUT matches neither verb.
    let response = block_on(pipeline.process(WireRequest::new("PUT", "/GetCustomer")));
    assert_eq!(response.status, 404);
}

#[test]
fn xml_reply_uses_type_name_root() {
    let pipeline = auto_pipeline(PipelineOptions::default().format(WireFormat::Xml));
    let response = block_on(pipeline.process(WireRequest::new("GET", "/GetCustomer/42")));

    assert_eq!(response.status, 200);
    assert!(response.header("Content-Type").unwrap().starts_with("application/xml"));
    let body = response.text();
    assert!(body.starts_with("<GetCustomerResponse>"));
    assert!(body.contains("<Id>42</Id>"));
}

#[test]
fn file_reply_is_streamed_raw() {
    let pipeline = auto_pipeline(PipelineOptions::default());
    let response = block_on(pipeline.process(WireRequest::new("GET", "/Export")));

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("text/csv"));
    assert_eq!(
        response.header("Content-Disposition"),
        Some("inline; filename=\"customers.csv\"")
    );
    assert_eq!(response.text(), "Id,Name\n1,Ada\n");
}

#[test]
fn camel_case_round_trip() {
    let pipeline = auto_pipeline(PipelineOptions::default().casing(Casing::CamelCase));
    let response = block_on(pipeline.process(
        WireRequest::new("POST", "/GetCustomer").with_body(r#"{"id":"9",}"#),
    ));
    let body: Value = response.json().unwrap();
    assert_eq!(body["customer"]["id"], Value::from("9"));
}
