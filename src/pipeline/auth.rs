//! Authorization hook and cross-origin policy.

use serde::{Deserialize, Serialize};

use super::context::RequestContext;

/// Authorization hook consulted before parameters are built.
///
/// The resolved operation and the caller identity are available on the
/// context. Any `Fn(&RequestContext) -> bool` is an authorizer.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, context: &RequestContext<'_>) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&RequestContext<'_>) -> bool + Send + Sync,
{
    fn authorize(&self, context: &RequestContext<'_>) -> bool {
        self(context)
    }
}

/// Cross-origin policy. When set, `OPTIONS` requests are answered directly
/// with 204 and every response carries the allow-origin header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsPolicy {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub max_age_secs: u32,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Accept, Authorization, SOAPAction".to_string(),
            max_age_secs: 1728000,
        }
    }
}

impl CorsPolicy {
    pub fn allow_origin(origin: &str) -> Self {
        Self {
            allow_origin: origin.to_string(),
            ..Self::default()
        }
    }

    /// Headers sent on every response.
    pub(crate) fn response_headers(&self) -> Vec<(&'static str, String)> {
        vec![("Access-Control-Allow-Origin", self.allow_origin.clone())]
    }

    /// Headers sent on the preflight (`OPTIONS`) response.
    pub(crate) fn preflight_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = self.response_headers();
        headers.push(("Access-Control-Allow-Methods", self.allow_methods.clone()));
        headers.push(("Access-Control-Allow-Headers", self.allow_headers.clone()));
        headers.push(("Access-Control-Max-Age", self.max_age_secs.to_string()));
        headers
    }
}
