// Dynamic value lattice for the Tabula shape engine
//
// This module defines the value type flowing in and out of instances,
// ensuring every stored field value carries its runtime type, plus the
// conversions to and from serde_json at the crate boundary.

use crate::blueprint::instance::Instance;

/// The castable primitive types a scalar field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarType {
    /// Returns the type name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Str => "str",
        }
    }

    /// Returns true if the value already satisfies this type, no cast needed.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::Int, Value::Int(_))
                | (ScalarType::Float, Value::Float(_))
                | (ScalarType::Str, Value::Str(_))
        )
    }
}

/// A dynamic field value.
///
/// `Map` keeps its entries as an ordered vector, preserving insertion
/// order. `Record` carries a live instance; it never appears in
/// serializer output.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    Record(Instance),
}

impl Value {
    /// Returns the runtime type name of this value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Builds a map value from key/value pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a list value.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(items.into_iter().collect())
    }

    /// An empty map value.
    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    /// Looks up an entry of a map value by key.
    pub fn entry(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Converts a serde_json value into a dynamic value.
    ///
    /// Integral JSON numbers become `Int`, everything else numeric becomes
    /// `Float`; objects become ordered maps.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts this value into a serde_json value for downstream encoding.
    ///
    /// `Record` values are serialized first, so the JSON output contains
    /// mappings, lists and scalars only.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => {
                let mut obj = serde_json::Map::new();
                for (key, value) in entries {
                    obj.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(obj)
            }
            Value::Record(instance) => instance.serialize().to_json(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Record(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_number_split() {
        let json: serde_json::Value = serde_json::from_str("[1, 1.5]").unwrap();
        assert_eq!(
            Value::from_json(&json),
            Value::list([Value::Int(1), Value::Float(1.5)])
        );
    }

    #[test]
    fn test_json_round_trip_preserves_scalars() {
        let value = Value::map([
            ("name", Value::from("tabula")),
            ("count", Value::from(3)),
            ("ratio", Value::from(0.5)),
            ("live", Value::from(true)),
            ("note", Value::Null),
        ]);
        assert_eq!(Value::from_json(&value.to_json()), value);
    }

    #[test]
    fn test_entry_lookup() {
        let value = Value::map([("a", Value::from(1)), ("b", Value::from(2))]);
        assert_eq!(value.entry("b"), Some(&Value::Int(2)));
        assert_eq!(value.entry("c"), None);
    }

    #[test]
    fn test_scalar_type_matches() {
        assert!(ScalarType::Int.matches(&Value::Int(1)));
        assert!(!ScalarType::Int.matches(&Value::Str("1".to_string())));
        assert!(ScalarType::Str.matches(&Value::Str(String::new())));
    }
}
