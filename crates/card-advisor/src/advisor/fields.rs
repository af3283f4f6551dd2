//! Defensive accessors over loosely shaped JSON payloads.

use serde_json::{Map, Value};

/// First present, non-null value among `keys`.
pub(crate) fn pick<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Accepts JSON numbers and numeric strings such as "₹45,000".
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(raw) => {
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

pub(crate) fn number_at(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    pick(object, keys).and_then(number)
}

/// Non-negative whole amount, 0 for anything unusable.
pub(crate) fn amount_at(object: &Map<String, Value>, keys: &[&str]) -> u64 {
    number_at(object, keys)
        .filter(|n| *n > 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0)
}

pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub(crate) fn text_at(object: &Map<String, Value>, keys: &[&str]) -> String {
    pick(object, keys).and_then(text).unwrap_or_default()
}

/// Arrays of strings, or a single delimited string; anything else is empty.
pub(crate) fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(text)
            .filter(|item| !item.is_empty())
            .collect(),
        Value::String(raw) => raw
            .split([';', ',', '|', '\n'])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn text_list_at(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    pick(object, keys).map(text_list).unwrap_or_default()
}

/// Strict array accessor for questionnaire lists: non-arrays become empty.
pub(crate) fn array_at(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match pick(object, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(text)
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn flag_at(object: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    pick(object, keys).and_then(flag)
}
