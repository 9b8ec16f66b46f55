//! Fault translation: turning an operation failure into a populated reply.

use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::Write;

use crate::contract::Reply;
use crate::error::InvocationError;

/// The real cause behind a delivered fault.
pub struct Unwrapped<'a> {
    pub cause: &'a (dyn Error + 'static),
    /// Type name of the error the operation returned, when known.
    pub error_type: Option<&'static str>,
    pub backtrace: Option<&'a Backtrace>,
}

/// Unwrap exactly one [`InvocationError`] level, if present.
pub fn unwrap_invocation<'a>(fault: &'a (dyn Error + Send + Sync + 'static)) -> Unwrapped<'a> {
    match fault.downcast_ref::<InvocationError>() {
        Some(wrapper) => Unwrapped {
            cause: wrapper.cause(),
            error_type: Some(wrapper.error_type()),
            backtrace: wrapper.backtrace(),
        },
        None => Unwrapped {
            cause: fault,
            error_type: None,
            backtrace: None,
        },
    }
}

/// Failure text for a fault raised by `declaring_type::method`.
///
/// Redacted unless `verbose` is set; verbose text flattens the whole error
/// chain with the captured stack frames.
pub fn failure_message(
    fault: &(dyn Error + Send + Sync + 'static),
    declaring_type: &str,
    method: &str,
    verbose: bool,
) -> String {
    if !verbose {
        return format!("Generic error in {}::{}", declaring_type, method);
    }

    let unwrapped = unwrap_invocation(fault);
    let mut out = String::new();
    let mut current = Some(unwrapped.cause);
    let mut depth = 0;
    while let Some(err) = current {
        if depth > 0 {
            out.push_str("--- inner error ---\n");
        }
        let type_name = match unwrapped.error_type {
            Some(name) if depth == 0 && !name.contains("dyn ") => name.to_string(),
            _ => debug_type_name(err),
        };
        let _ = writeln!(out, "Message: {}", err);
        let _ = writeln!(out, "Type: {}", type_name);
        let _ = writeln!(out, "Source: {}", declaring_type);
        let _ = writeln!(out, "Target: {}::{}", declaring_type, method);
        current = err.source();
        depth += 1;
    }

    if let Some(backtrace) = unwrapped.backtrace {
        out.push_str("Stack:\n");
        for frame in stack_frames(&backtrace.to_string()) {
            let _ = writeln!(out, "   at {}", frame);
        }
    }
    out.trim_end().to_string()
}

/// Default instance of `R` with its failure fields populated.
///
/// Replies without failure fields come back as an unpopulated default.
pub fn populate<R: Reply>(message: String) -> R {
    let mut reply = R::default();
    if let Some(fields) = reply.failure_fields() {
        *fields.success = false;
        *fields.failure_information = message;
    }
    reply
}

/// Translate a fault into a failure reply of type `R`.
pub fn translate<R: Reply>(
    fault: &(dyn Error + Send + Sync + 'static),
    declaring_type: &str,
    method: &str,
    verbose: bool,
) -> R {
    populate(failure_message(fault, declaring_type, method, verbose))
}

// Leading identifier of the Debug form: `NotFound { .. }` -> `NotFound`.
fn debug_type_name(err: &dyn Error) -> String {
    let debug = format!("{:?}", err);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "error".to_string()
    } else {
        name
    }
}

fn stack_frames(rendered: &str) -> Vec<&str> {
    rendered
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let (index, symbol) = line.split_once(": ")?;
            index.parse::<usize>().ok()?;
            Some(symbol)
        })
        .collect()
}
