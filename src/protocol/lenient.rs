//! Field-level deserializers that never reject a document.
//!
//! Protocol JSON is hand-written and inconsistent: a field may be a string in
//! one file and a number in the next, lists hold stray `null`s, blocks appear
//! as a single object where a list is expected. Each helper reads the raw
//! `serde_json::Value` and keeps what is usable. Anything else becomes
//! "absent", which the engine already knows how to skip.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::when::When;

// ── Value-level conversions ────────────────────────────────────────────────

/// A display string. Numbers are stringified; empty strings count as absent.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A number, accepting numeric strings the way the views always have.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Loose truthiness for presence flags: null, false, 0 and "" are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Deserializes every object element of an array, dropping the rest.
pub fn objects_of<T: DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

/// Text entries of a list. Objects contribute their `titulo` or `nombre`.
pub fn labels_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => map
                .get("titulo")
                .and_then(as_text)
                .or_else(|| map.get("nombre").and_then(as_text)),
            other => as_text(other),
        })
        .collect()
}

/// Numeric entries of a key→number object, in document order.
pub fn numbers_of(map: &Map<String, Value>) -> BTreeMap<String, f64> {
    map.iter()
        .filter_map(|(key, value)| as_number(value).map(|n| (key.clone(), n)))
        .collect()
}

// ── Field deserializers (`#[serde(deserialize_with = ...)]`) ────────────────

pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_text(&value))
}

/// Required-ish identifier: absent or unusable becomes the empty string.
pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_text(&value).unwrap_or_default())
}

pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_number(&value))
}

pub fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(is_truthy(&value))
}

pub fn when<'de, D: Deserializer<'de>>(d: D) -> Result<Option<When>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(When::from_value(&value))
}

/// A list of objects; anything that is not an array yields an empty list.
pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Array(items) => objects_of(items),
        _ => Vec::new(),
    })
}

/// Like [`list`] but keeps "absent" apart from "present and empty", which
/// matters for version → base fallback.
pub fn opt_list<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Array(items) => Some(objects_of(items)),
        _ => None,
    })
}

/// A list that some documents write as a single object.
pub fn one_or_many<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Array(items) => objects_of(items),
        Value::Object(_) => serde_json::from_value(value.clone()).ok().into_iter().collect(),
        _ => Vec::new(),
    })
}

/// A nested block. Non-objects are absent.
pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Array(items) => labels_of(items),
        _ => Vec::new(),
    })
}

/// `Some(list)` only when the field is an array; mirrors `Array.isArray` checks.
pub fn opt_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Array(items) => Some(labels_of(items)),
        _ => None,
    })
}

pub fn numbers<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Object(map) => numbers_of(map),
        _ => BTreeMap::new(),
    })
}

/// An object of named sub-objects, in document order.
pub fn keyed<'de, D, T>(d: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, v)| v.is_object())
            .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|t| (k, t)))
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_drops_empty_and_non_scalars() {
        assert_eq!(as_text(&json!("Cirugía")), Some("Cirugía".into()));
        assert_eq!(as_text(&json!(12)), Some("12".into()));
        assert_eq!(as_text(&json!("  ")), None);
        assert_eq!(as_text(&json!({"a": 1})), None);
        assert_eq!(as_text(&Value::Null), None);
    }

    #[test]
    fn number_accepts_numeric_strings() {
        assert_eq!(as_number(&json!(2.5)), Some(2.5));
        assert_eq!(as_number(&json!(" 3 ")), Some(3.0));
        assert_eq!(as_number(&json!("tres")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn test_loose_truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("x")));
    }

    #[test]
    fn labels_take_titles_from_objects() {
        let items = vec![json!("Filgrastim"), json!({"titulo": "Transfusión"}), json!(null)];
        assert_eq!(labels_of(&items), vec!["Filgrastim", "Transfusión"]);
    }

    #[test]
    fn numbers_skip_non_numeric_entries() {
        let map = json!({"A": 6, "B": "3", "C": "x"});
        let parsed = numbers_of(map.as_object().unwrap());
        assert_eq!(parsed.get("A"), Some(&6.0));
        assert_eq!(parsed.get("B"), Some(&3.0));
        assert!(!parsed.contains_key("C"));
    }
}
