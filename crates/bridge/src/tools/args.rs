//! Readers for flat argument bags.
//!
//! Each reader takes a list of accepted keys; the first key holding a usable
//! value wins. Blank strings count as absent.

use std::fmt::Display;
use std::str::FromStr;

use crm_bridge_core::MonetaryValue;
use serde_json::Value;

use super::ToolError;

/// Trimmed text under the first present key. Numbers are rendered as text
/// so ids typed as numbers still work.
pub fn text(input: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match input.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Text under the first present key, parsed with `FromStr`.
pub fn parsed<T>(input: &Value, keys: &[&str], field: &'static str) -> Result<Option<T>, ToolError>
where
    T: FromStr,
    T::Err: Display,
{
    text(input, keys)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ToolError::InvalidArgument {
                field,
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Text under the first present key, parsed with a fallible constructor.
pub fn parsed_with<T, E: Display>(
    input: &Value,
    keys: &[&str],
    field: &'static str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<T>, ToolError> {
    text(input, keys)
        .map(|raw| {
            parse(&raw).map_err(|e| ToolError::InvalidArgument {
                field,
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Integer from a number or a numeric string.
#[allow(clippy::cast_possible_truncation)]
pub fn integer(input: &Value, keys: &[&str], field: &'static str) -> Result<Option<i64>, ToolError> {
    for key in keys {
        match input.get(*key) {
            Some(Value::Number(n)) => {
                return n
                    .as_i64()
                    // Floats such as 10.0 from loosely typed callers.
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(Some)
                    .ok_or_else(|| ToolError::InvalidArgument {
                        field,
                        reason: format!("expected an integer, got {n}"),
                    });
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return s
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| ToolError::InvalidArgument {
                        field,
                        reason: format!("expected an integer, got '{s}'"),
                    });
            }
            _ => {}
        }
    }
    Ok(None)
}

/// List limit clamped to `1..=max`, `default` when absent.
pub fn limit(input: &Value, default: u32, max: u32) -> Result<u32, ToolError> {
    let requested = integer(input, &["limit", "limite"], "limit")?.unwrap_or(i64::from(default));
    let clamped = requested.clamp(1, i64::from(max));
    Ok(u32::try_from(clamped).unwrap_or(default))
}

/// Monetary value from a number or a (possibly Brazilian-formatted) string.
pub fn money(input: &Value, keys: &[&str], field: &'static str) -> Result<MonetaryValue, ToolError> {
    let invalid = |reason: String| ToolError::InvalidArgument { field, reason };
    for key in keys {
        match input.get(*key) {
            Some(Value::Number(n)) => {
                let amount = n.as_f64().ok_or_else(|| invalid(n.to_string()))?;
                return MonetaryValue::from_f64(amount).map_err(|e| invalid(e.to_string()));
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return s.parse().map_err(|e: crm_bridge_core::MonetaryValueError| {
                    invalid(e.to_string())
                });
            }
            _ => {}
        }
    }
    Ok(MonetaryValue::ZERO)
}

/// Boolean from `true`/`false` or a yes/no string.
pub fn flag(input: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|key| match input.get(*key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "sim"
        ),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

/// Tags from an array of strings or a comma-separated string.
pub fn tags(input: &Value, key: &str) -> Vec<String> {
    match input.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
