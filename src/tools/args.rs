//! Argument extraction for tool handlers.
//!
//! Required arguments that are absent, `null` or empty fail with
//! `MissingArgument` before any external call is made. Values that end up
//! inside a CLI invocation must also pass `safe_token`.

use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::storage::DEFAULT_MAX_RESULTS;

pub type Args = Map<String, Value>;

/// A required string argument. `label` is the human name used in the error.
pub fn required_str<'a>(args: &'a Args, key: &str, label: &'static str) -> crate::Result<&'a str> {
    optional_str(args, key).ok_or(GatewayError::MissingArgument(label))
}

/// An optional string argument; empty strings count as absent.
pub fn optional_str<'a>(args: &'a Args, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `maxResults`, defaulting to 100. Accepts a positive integer or a numeric
/// string.
pub fn max_results(args: &Args) -> crate::Result<usize> {
    let invalid = |detail: String| GatewayError::InvalidArgument("maxResults", detail);
    let value = match args.get("maxResults") {
        None | Some(Value::Null) => return Ok(DEFAULT_MAX_RESULTS),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("expected a positive integer, got {}", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid(format!("expected a positive integer, got '{}'", s)))?,
        Some(other) => return Err(invalid(format!("expected a positive integer, got {}", other))),
    };
    if value == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(usize::try_from(value).unwrap_or(usize::MAX))
}

/// An optional `{string: string}` map such as labels or tags, in key order.
pub fn string_map(args: &Args, key: &'static str) -> crate::Result<Vec<(String, String)>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                Value::Number(n) => Ok((k.clone(), n.to_string())),
                Value::Bool(b) => Ok((k.clone(), b.to_string())),
                _ => Err(GatewayError::InvalidArgument(
                    key,
                    format!("value for '{}' must be a string", k),
                )),
            })
            .collect(),
        Some(_) => Err(GatewayError::InvalidArgument(key, "expected an object".to_string())),
    }
}

/// Reject values that would change the shape of a generated command.
///
/// Allowed: ASCII letters, digits and `. _ : / -`. `=` is allowed only when
/// `allow_equals` is set, for values that are already key=value pairs.
pub fn safe_token<'a>(key: &'static str, value: &'a str, allow_equals: bool) -> crate::Result<&'a str> {
    let bad = value.chars().find(|c| {
        !(c.is_ascii_alphanumeric()
            || matches!(c, '.' | '_' | ':' | '/' | '-')
            || (allow_equals && *c == '='))
    });
    match bad {
        Some(c) => Err(GatewayError::InvalidArgument(
            key,
            format!("character {:?} is not allowed", c),
        )),
        None if value.starts_with('-') => Err(GatewayError::InvalidArgument(
            key,
            "must not start with '-'".to_string(),
        )),
        None => Ok(value),
    }
}
