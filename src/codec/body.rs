//! Request and response body codec (JSON / XML) with casing conventions.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::{ParameterDescriptor, Parameter};
use crate::error::HostError;

/// Body format of a REST binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    #[default]
    Json,
    Xml,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Json => "application/json; charset=utf-8",
            WireFormat::Xml => "application/xml; charset=utf-8",
        }
    }
}

/// Property-name convention on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    /// Names exactly as declared on the Rust types.
    #[default]
    Declared,
    /// `camelCase` on the wire, declared names in Rust.
    CamelCase,
}

/// Whether a body carries no document at all.
pub fn is_empty_body(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

/// Deserialize a non-empty request body into a JSON value.
///
/// JSON keys are matched case-insensitively against the parameter's declared
/// properties and trailing commas are tolerated. XML goes through the typed
/// decoder of the operation's parameter.
pub fn read_body(
    format: WireFormat,
    casing: Casing,
    body: &[u8],
    parameter: Option<&ParameterDescriptor>,
    decode_xml: Option<fn(&str) -> Result<Value, String>>,
) -> Result<Value, HostError> {
    let text = std::str::from_utf8(body).map_err(|e| HostError::BodyDecode(e.to_string()))?;
    match format {
        WireFormat::Json => {
            let mut value: Value = serde_json::from_str(&strip_trailing_commas(text))?;
            align_keys(&mut value, parameter, casing);
            Ok(value)
        }
        WireFormat::Xml => match decode_xml {
            Some(decode) => decode(text).map_err(HostError::BodyDecode),
            None => Err(HostError::BodyDecode(
                "operation has no XML parameter decoder".into(),
            )),
        },
    }
}

/// Serialize a reply value for the wire.
pub fn write_body(
    format: WireFormat,
    casing: Casing,
    mut value: Value,
    root: &str,
) -> Result<Vec<u8>, HostError> {
    if casing == Casing::CamelCase {
        rewrite_keys(&mut value, &|k| k.to_lower_camel_case());
    }
    match format {
        WireFormat::Json => {
            serde_json::to_vec(&value).map_err(|e| HostError::BodyEncode(e.to_string()))
        }
        WireFormat::Xml => quick_xml::se::to_string_with_root(root, &value)
            .map(String::into_bytes)
            .map_err(|e| HostError::BodyEncode(e.to_string())),
    }
}

/// Typed XML decoder for parameter type `P`.
pub(crate) fn xml_to_value<P: Parameter>(text: &str) -> Result<Value, String> {
    let parameter: P = quick_xml::de::from_str(text).map_err(|e| e.to_string())?;
    serde_json::to_value(parameter).map_err(|e| e.to_string())
}

/// Drop commas that directly precede `}` or `]`, outside string literals.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn rewrite_keys(value: &mut Value, rename: &dyn Fn(&str) -> String) {
    match value {
        Value::Object(map) => {
            let old = std::mem::take(map);
            *map = old
                .into_iter()
                .map(|(key, mut v)| {
                    rewrite_keys(&mut v, rename);
                    (rename(&key), v)
                })
                .collect::<Map<String, Value>>();
        }
        Value::Array(items) => items.iter_mut().for_each(|v| rewrite_keys(v, rename)),
        _ => {}
    }
}

// Top-level keys take the declared name of the property they match; with
// camelCase, unmatched and nested keys become snake_case.
fn align_keys(value: &mut Value, parameter: Option<&ParameterDescriptor>, casing: Casing) {
    let camel = casing == Casing::CamelCase;
    match value {
        Value::Object(map) => {
            let old = std::mem::take(map);
            *map = old
                .into_iter()
                .map(|(key, mut v)| {
                    if camel {
                        rewrite_keys(&mut v, &|k| k.to_snake_case());
                    }
                    let key = match parameter.and_then(|p| p.find(&key)) {
                        Some(property) => property.name.to_string(),
                        None if camel => key.to_snake_case(),
                        None => key,
                    };
                    (key, v)
                })
                .collect();
        }
        other if camel => rewrite_keys(other, &|k| k.to_snake_case()),
        _ => {}
    }
}
