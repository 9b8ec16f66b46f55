//! URL fragment encoding and decoding for parameter objects.
//!
//! Fragment shape: `/<inline>/<inline>...?<name>=<value>&...`

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use super::value;
use crate::contract::{split_bindings, HttpVerb, OperationDescriptor, Parameter, PropertyBinding};
use crate::error::HostError;

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encode a parameter object into an outbound fragment.
pub fn encode<P: Parameter>(parameter: &P, verb: HttpVerb) -> Result<String, HostError> {
    let (inline, named) = split_bindings(&P::properties());
    let value =
        serde_json::to_value(parameter).map_err(|e| HostError::BodyEncode(e.to_string()))?;
    Ok(encode_value(&value, &inline, &named, verb))
}

/// Encode an already-serialized parameter object.
///
/// Inline properties become path segments in order; a null encodes as an
/// empty segment. Named properties are appended as a query only for GET, only
/// when non-null, and never repeat a property already written inline.
pub fn encode_value(
    parameter: &Value,
    inline: &[PropertyBinding],
    named: &[PropertyBinding],
    verb: HttpVerb,
) -> String {
    let mut fragment = String::new();
    for property in inline {
        let text = value::encode(parameter.get(&property.name).unwrap_or(&Value::Null));
        fragment.push('/');
        fragment.push_str(&escape(&text));
    }

    if verb == HttpVerb::Get {
        let pairs: Vec<String> = named
            .iter()
            .filter(|p| !inline.iter().any(|i| i.name == p.name))
            .filter_map(|p| match parameter.get(&p.name) {
                None | Some(Value::Null) => None,
                Some(v) => Some(format!("{}={}", escape(&p.name), escape(&value::encode(v)))),
            })
            .collect();
        if !pairs.is_empty() {
            fragment.push('?');
            fragment.push_str(&pairs.join("&"));
        }
    }

    fragment
}

/// Decode the parameter part of a resolved fragment.
///
/// Inline segments map positionally onto the operation's inline properties;
/// query pairs map onto named properties by exact name. Extra segments and
/// unmatched keys are ignored.
pub fn decode_fragment(
    fragment: &str,
    operation: &OperationDescriptor,
) -> Result<Vec<(String, Value)>, HostError> {
    let (path, query) = match fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (fragment, None),
    };

    let mut bound = Vec::new();
    let path = path.strip_prefix('/').unwrap_or(path);
    if !path.is_empty() {
        for (segment, property) in path.split('/').zip(&operation.inline) {
            let text = unescape(segment, false);
            let value = value::decode(&text, &property.kind)
                .map_err(|e| HostError::binding(&property.name, e))?;
            bound.push((property.name.clone(), value));
        }
    }

    for (key, text) in query.map(parse_query).unwrap_or_default() {
        if let Some(property) = operation.named_property(&key) {
            let value = value::decode(&text, &property.kind)
                .map_err(|e| HostError::binding(&property.name, e))?;
            bound.push((property.name.clone(), value));
        }
    }

    Ok(bound)
}

/// Split a raw query string into decoded pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (unescape(key, true), unescape(value, true))
        })
        .collect()
}

fn escape(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

fn unescape(text: &str, plus_as_space: bool) -> String {
    if plus_as_space && text.contains('+') {
        let spaced = text.replace('+', " ");
        return percent_decode_str(&spaced).decode_utf8_lossy().into_owned();
    }
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}
