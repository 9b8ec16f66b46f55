//! contract_host integration tests.

mod support;
mod scenarios;
mod binding;
mod registry;

#[cfg(feature = "http")]
mod transport_http;
