//! Tolerant deserializers for hand-edited and provider-supplied fields
//!
//! User data is edited by hand and provider data is untrusted, so scalar
//! fields accept any reasonable spelling instead of failing the whole kind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render a scalar value as text
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a value into a list of strings
///
/// A single scalar becomes a one element list and `null` an empty one.
pub(crate) fn value_to_list(value: Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| format!("expected a list of strings, got {item}"))
            })
            .collect(),
        other => scalar_to_string(&other)
            .map(|s| vec![s])
            .ok_or_else(|| format!("expected a list of strings, got {other}")),
    }
}

/// Optional text; empty strings and `null` are `None`, lists are joined
pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Array(_) => {
            let joined = value_to_list(value).map_err(D::Error::custom)?.join(", ");
            Ok(Some(joined).filter(|s| !s.is_empty()))
        }
        Value::Object(_) => Err(D::Error::custom("expected a string, got a mapping")),
        other => Ok(scalar_to_string(&other).filter(|s| !s.is_empty())),
    }
}

/// List of strings accepting a single scalar
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    value_to_list(Value::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// Mapping of key to list of strings
pub(crate) fn string_list_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                value_to_list(value)
                    .map(|list| (key, list))
                    .map_err(D::Error::custom)
            })
            .collect(),
        other => Err(D::Error::custom(format!("expected a mapping, got {other}"))),
    }
}

/// Mapping of key to text
pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(&value).map(|v| (key, v)))
            .collect()),
        other => Err(D::Error::custom(format!("expected a mapping, got {other}"))),
    }
}

/// Parse a yes/no flag; `tbd` and anything unrecognised are `None`
#[must_use]
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Tri-state flag deserializer built on [`parse_flag`]
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_flag(&Value::deserialize(deserializer)?))
}

/// Plain boolean where unrecognised values are `false`
pub(crate) fn bool_or_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_flag(&Value::deserialize(deserializer)?).unwrap_or(false))
}

/// Timestamp in RFC 3339; unparsable values are dropped
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Unsigned integer accepting numeric strings
pub(crate) fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Signed integer accepting numeric strings
pub(crate) fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_list() {
        assert_eq!(value_to_list(json!("a")).unwrap(), vec!["a"]);
        assert_eq!(value_to_list(json!(["a", 1])).unwrap(), vec!["a", "1"]);
        assert!(value_to_list(json!(null)).unwrap().is_empty());
        assert!(value_to_list(json!({"a": 1})).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(&json!(true)), Some(true));
        assert_eq!(parse_flag(&json!("False")), Some(false));
        assert_eq!(parse_flag(&json!("tbd")), None);
        assert_eq!(parse_flag(&json!(3)), None);
    }
}
