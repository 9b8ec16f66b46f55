//! HTTP transport integration tests.
//!
//! Hosts register on port 0 and are exercised with reqwest.

use std::sync::Arc;

use contract_host::host::HttpTransport;
use contract_host::pipeline::{FAULT_HEADER, PRODUCT_HEADER};
use contract_host::{HostManager, HostOptions, Implementation, ServiceCatalog};
use serde_json::{json, Value};

use crate::support::{auto, strict, GetCustomerResponse, SearchResponse};

fn manager() -> HostManager {
    crate::support::init_tracing();
    let mut catalog = ServiceCatalog::new();
    catalog
        .register(Implementation::new("customers").contract(auto("http")))
        .register(Implementation::new("strict").contract(strict("http")));
    HostManager::new(catalog).with_transport(Arc::new(HttpTransport::current()))
}

#[tokio::test(flavor = "multi_thread")]
async fn post_and_get_over_http() {
    let manager = manager();
    let host = manager
        .register_host("customers", None, "http://127.0.0.1:0/api", HostOptions::default())
        .unwrap();
    let base = host.listen_address().to_string();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/GetCustomer"))
        .json(&json!({ "id": "42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key(PRODUCT_HEADER));
    let reply: GetCustomerResponse = resp.json().await.unwrap();
    assert_eq!(reply.customer.id, "42");

    let resp = client.get(format!("{base}/GetCustomer/42")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let reply: GetCustomerResponse = resp.json().await.unwrap();
    assert_eq!(reply.customer.id, "42");
}

#[tokio::test(flavor = "multi_thread")]
async fn route_template_values_bind() {
    let manager = manager();
    let host = manager
        .register_host(
            "customers",
            None,
            "http://127.0.0.1:0/by/{Name}",
            HostOptions::default(),
        )
        .unwrap();
    let authority = host
        .listen_address()
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap()
        .to_string();

    let resp = reqwest::get(format!(
        "http://{authority}/by/Ada%20Lovelace/CustomerSearch/South?Name=ignored"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    let reply: SearchResponse = resp.json().await.unwrap();
    assert_eq!(reply.matches[0].name, "Ada Lovelace");
    assert_eq!(reply.matches[0].region, "South");
}

#[tokio::test(flavor = "multi_thread")]
async fn faults_over_http() {
    let manager = manager();
    let auto_host = manager
        .register_host("customers", None, "http://127.0.0.1:0", HostOptions::default())
        .unwrap();
    let strict_host = manager
        .register_host("strict", None, "http://127.0.0.1:0", HostOptions::default())
        .unwrap();
    let client = reqwest::Client::new();

    // Both hosts asked for port 0, so they share the registry key.
    assert!(!auto_host.is_open());
    assert_eq!(manager.hosts().unwrap().len(), 1);

    let resp = client
        .post(format!("{}/Explode", strict_host.listen_address()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.headers().contains_key(FAULT_HEADER));
    assert!(resp.bytes().await.unwrap().is_empty());

    let auto_host = manager
        .register_host("customers", None, "http://127.0.0.1:0/auto", HostOptions::default())
        .unwrap();
    let resp = client
        .post(format!("{}/Explode", auto_host.listen_address()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["Success"], json!(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn paths_outside_the_root_are_404() {
    let manager = manager();
    let host = manager
        .register_host("customers", None, "http://127.0.0.1:0/api", HostOptions::default())
        .unwrap();
    let base = host.listen_address().trim_end_matches("/api").to_string();

    let resp = reqwest::get(format!("{base}/other/GetCustomer/1")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().contains_key(PRODUCT_HEADER));
}

#[tokio::test(flavor = "multi_thread")]
async fn replacing_a_fixed_port_host_rebinds_the_port() {
    let manager = manager();
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let address = format!("http://127.0.0.1:{port}/svc");

    let first = manager
        .register_host("strict", None, &address, HostOptions::default())
        .unwrap();
    let second = manager
        .register_host("customers", None, &address, HostOptions::default())
        .unwrap();

    assert!(!first.is_open());
    assert!(second.is_open());
    assert_eq!(second.listen_address(), address);
    assert_eq!(manager.hosts().unwrap().len(), 1);

    let resp = reqwest::Client::new()
        .post(format!("{address}/Explode"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["Success"], json!(false));
}
