//! Transport-neutral request and response.

use serde::de::DeserializeOwned;

use super::identity::Identity;
use crate::error::HostError;

/// One inbound request, relative to the service root.
#[derive(Debug, Clone, Default)]
pub struct WireRequest {
    /// HTTP method as received.
    pub method: String,
    /// Path below the service root, e.g. `/GetCustomer/42`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Values captured by the host's route template.
    pub route_values: Vec<(String, String)>,
    /// Header names are kept as received; lookups ignore case.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Whether the request arrived over a secure channel.
    pub secure: bool,
    pub identity: Identity,
}

impl WireRequest {
    /// A request for `method` and `target` (`path[?query]`).
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_route_value(mut self, name: &str, value: &str) -> Self {
        self.route_values.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response produced by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub(crate) fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HostError> {
        serde_json::from_slice(&self.body).map_err(HostError::from)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
