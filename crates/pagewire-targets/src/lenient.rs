//! Tolerant field deserializers.
//!
//! Site payloads encode the same field differently across endpoints and
//! over time (`1` vs `true`, `42` vs `"42"`). These accept any of the shapes
//! seen in practice and fall back to the default for the rest.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A boolean sent as a bool, a number, or a string.
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(value) => value,
        Value::Number(value) => value.as_u64().is_some_and(|n| n != 0),
        Value::String(value) => matches!(value.trim(), "1" | "true"),
        _ => false,
    })
}

/// A count sent as a number or a numeric string.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(value) => value.as_u64().unwrap_or(0),
        Value::String(value) => value.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Fields {
        #[serde(deserialize_with = "flag")]
        more: bool,
        #[serde(deserialize_with = "count")]
        total: u64,
    }

    fn fields(json: &str) -> Fields {
        serde_json::from_str(json).expect("valid json")
    }

    #[test]
    fn test_flag_shapes() {
        assert!(fields(r#"{"more": 1}"#).more);
        assert!(fields(r#"{"more": true}"#).more);
        assert!(fields(r#"{"more": "1"}"#).more);
        assert!(!fields(r#"{"more": 0}"#).more);
        assert!(!fields(r#"{"more": null}"#).more);
        assert!(!fields("{}").more);
    }

    #[test]
    fn test_count_shapes() {
        assert_eq!(fields(r#"{"total": 42}"#).total, 42);
        assert_eq!(fields(r#"{"total": "1337"}"#).total, 1337);
        assert_eq!(fields(r#"{"total": "n/a"}"#).total, 0);
        assert_eq!(fields(r#"{"total": -3}"#).total, 0);
    }
}
