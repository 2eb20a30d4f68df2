//! Lenient decoding of oracle output
//!
//! The oracle is a language model, so its JSON is only loosely shaped. These
//! helpers are used as `deserialize_with` functions and never fail: a value
//! of the wrong type decodes to an empty default instead.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static RE_FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());
static RE_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").unwrap());
static RE_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)(\[.*\])").unwrap());

/// Renders a scalar as a string; anything else becomes ""
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

/// A list of strings; non-scalar elements are dropped
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter(|item| !item.is_array() && !item.is_object() && !item.is_null())
        .map(scalar_to_string)
        .collect())
}

/// A list of records; elements that are not objects are dropped
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(records_from_value(value))
}

/// An optional record; anything other than an object is absent
pub fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(record_from_value(value))
}

pub(crate) fn records_from_value<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(record_from_value).collect(),
        _ => Vec::new(),
    }
}

fn record_from_value<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Pulls a JSON object out of raw oracle text
///
/// Tries, in order: the first fenced code block (or, failing that, the
/// widest `{...}` span), then the whole text. Anything that does not yield
/// an object gives an empty object.
///
/// # Examples
///
/// ```
/// use marketlens::extraction::parse_json_object;
///
/// let raw = "Here you go:\n```json\n{\"tech_stack\": \"Rust\"}\n```";
/// assert_eq!(parse_json_object(raw)["tech_stack"], "Rust");
/// assert!(parse_json_object("no json here").as_object().unwrap().is_empty());
/// ```
pub fn parse_json_object(raw: &str) -> Value {
    let candidate = RE_FENCED
        .captures(raw)
        .or_else(|| RE_OBJECT.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    candidate
        .into_iter()
        .chain(std::iter::once(raw))
        .filter_map(|text| serde_json::from_str::<Value>(text.trim()).ok())
        .find(Value::is_object)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Pulls a JSON array out of raw oracle text
///
/// Same search as [`parse_json_object`] with `[...]` spans. Anything that
/// does not yield an array gives an empty array.
pub fn parse_json_array(raw: &str) -> Value {
    let candidate = RE_FENCED
        .captures(raw)
        .or_else(|| RE_ARRAY.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    candidate
        .into_iter()
        .chain(std::iter::once(raw))
        .filter_map(|text| serde_json::from_str::<Value>(text.trim()).ok())
        .find(Value::is_array)
        .unwrap_or_else(|| Value::Array(Vec::new()))
}
