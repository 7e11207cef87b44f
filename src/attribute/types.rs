//! Attribute data types - parse-from-text and value validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Type of a typed attribute value.
///
/// Serialized as `{"type": "<identifier>"}`, with the permitted `values`
/// added for enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeType {
    /// Integral number.
    Int,
    /// Any number; integers are accepted.
    Float,
    /// One of a fixed set of strings.
    Enum {
        /// Permitted values.
        values: Vec<String>,
    },
    /// Key-value object.
    Dict,
    /// Ordered sequence of values.
    #[serde(rename = "array")]
    List,
}

impl AttributeType {
    /// Create an enumeration type over the given values.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Stable identifier used in serialized attribute definitions.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Enum { .. } => "enum",
            Self::Dict => "dict",
            Self::List => "array",
        }
    }

    /// Parse a textual representation into a typed value.
    ///
    /// Dictionaries and lists accept JSON as well as the loose
    /// `{key: number, ...}` / `[number, ...]` notation used by command line
    /// clients.
    ///
    /// # Errors
    ///
    /// Returns the reason the text does not represent a value of this type.
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        let text = text.trim();
        let value = match self {
            Self::Int => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("not an integer: {text}"))?,
            Self::Float => parse_number(text).ok_or_else(|| format!("not a number: {text}"))?,
            Self::Enum { .. } => Value::String(text.to_string()),
            Self::Dict => match serde_json::from_str::<Value>(text) {
                Ok(value @ Value::Object(_)) => value,
                _ => parse_loose_dict(text)
                    .map(Value::Object)
                    .ok_or_else(|| format!("not a dictionary: {text}"))?,
            },
            Self::List => match serde_json::from_str::<Value>(text) {
                Ok(value @ Value::Array(_)) => value,
                _ => parse_loose_list(text)
                    .map(Value::Array)
                    .ok_or_else(|| format!("not a list: {text}"))?,
            },
        };
        self.validate(&value)?;
        Ok(value)
    }

    /// Check that a value is of this type.
    ///
    /// # Errors
    ///
    /// Returns the reason the value was rejected.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let valid = match self {
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Enum { values } => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
            Self::Dict => value.is_object(),
            Self::List => value.is_array(),
        };
        if valid {
            Ok(())
        } else {
            Err(format!("expected {}, got {value}", self.identifier()))
        }
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_loose_dict(text: &str) -> Option<Map<String, Value>> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?.trim();
    let mut map = Map::new();
    if inner.is_empty() {
        return Some(map);
    }
    for pair in inner.split(',') {
        let (key, value) = pair.split_once(':')?;
        let key = key.trim().trim_matches(|c| c == '\'' || c == '"');
        if key.is_empty() {
            return None;
        }
        map.insert(key.to_string(), parse_number(value.trim())?);
    }
    Some(map)
}

fn parse_loose_list(text: &str) -> Option<Vec<Value>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner.split(',').map(|item| parse_number(item.trim())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_values() {
        assert_eq!(AttributeType::Float.parse("0.1").unwrap(), json!(0.1));
        assert!(AttributeType::Float.parse("abc").is_err());

        assert_eq!(AttributeType::Int.parse("1").unwrap(), json!(1));
        assert!(AttributeType::Int.parse("0.45").is_err());

        let t = AttributeType::enumeration(["A", "B"]);
        assert_eq!(t.parse("A").unwrap(), json!("A"));
        assert!(t.parse("0.45").is_err());

        let dict = AttributeType::Dict.parse("{1:0.3, 2:0.6}").unwrap();
        assert_eq!(dict, json!({"1": 0.3, "2": 0.6}));
        assert!(AttributeType::Dict.parse("abc").is_err());

        assert_eq!(AttributeType::List.parse("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert!(AttributeType::List.parse("abc").is_err());
    }

    #[test]
    fn test_type_check() {
        assert!(AttributeType::Float.validate(&json!(0.1)).is_ok());
        assert!(AttributeType::Float.validate(&json!(10)).is_ok());
        assert!(AttributeType::Float.validate(&json!("abc")).is_err());

        assert!(AttributeType::Int.validate(&json!(1)).is_ok());
        assert!(AttributeType::Int.validate(&json!(0.45)).is_err());

        let t = AttributeType::enumeration(["A", "B"]);
        assert!(t.validate(&json!("A")).is_ok());
        assert!(t.validate(&json!("0.45")).is_err());

        assert!(AttributeType::Dict.validate(&json!({"A": 1})).is_ok());
        assert!(AttributeType::Dict.validate(&json!("abc")).is_err());

        assert!(AttributeType::List.validate(&json!([1, 2, 3])).is_ok());
        assert!(AttributeType::List.validate(&json!("abc")).is_err());
    }

    #[test]
    fn test_type_serialization() {
        let t = AttributeType::enumeration(["A", "B"]);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json, json!({"type": "enum", "values": ["A", "B"]}));
        assert_eq!(
            serde_json::to_value(AttributeType::List).unwrap(),
            json!({"type": "array"})
        );
    }
}
