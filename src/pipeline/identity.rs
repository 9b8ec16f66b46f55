//! Caller identity attached to a request.

use std::collections::HashMap;

/// Header carrying the authenticated caller name.
pub const IDENTITY_NAME_HEADER: &str = "x-identity-name";
/// Header carrying the caller's roles, comma separated.
pub const IDENTITY_ROLES_HEADER: &str = "x-identity-roles";

/// Name, roles and extra claims of the caller.
///
/// Over HTTP these come from request headers set by a fronting gateway:
///
/// ```text
/// x-identity-name: alice
/// x-identity-roles: reader, auditor
/// ```
///
/// Every other header is kept as a claim under its lowercased name.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    name: Option<String>,
    roles: Vec<String>,
    claims: HashMap<String, String>,
}

impl Identity {
    /// An anonymous caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Build an identity from request headers.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut identity = Self::default();
        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            match name.as_str() {
                IDENTITY_NAME_HEADER => {
                    let value = value.trim();
                    if !value.is_empty() {
                        identity.name = Some(value.to_string());
                    }
                }
                IDENTITY_ROLES_HEADER => identity.roles.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_string),
                ),
                _ => {
                    identity.claims.insert(name, value.to_string());
                }
            }
        }
        identity
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Case-insensitive role membership.
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the caller carries at least one of `roles`.
    pub fn is_in_any(&self, roles: &[String]) -> bool {
        roles.iter().any(|r| self.is_in_role(r))
    }

    pub fn claim(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(|v| v.as_str())
    }

    pub fn set_claim(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.claims.insert(key.into(), value.into());
    }
}
