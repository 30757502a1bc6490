use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

/// Key under which a bean's runtime type travels in its JSON form.
pub const TYPE_HINT_KEY: &str = "_class";

static NULL: Value = Value::Null;

/// Runtime instance of a described type: its concrete type name and field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bean {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Bean {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Absent fields read as `Value::Null`.
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    List(Vec<Value>),
    /// Insertion-ordered, duplicate-free collection.
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Bean),
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::List(_) => "LIST",
            Self::Set(_) => "SET",
            Self::Map(_) => "MAP",
            Self::Object(bean) => bean.type_name(),
        }
    }

    /// Builds a set, dropping later duplicates.
    pub fn set_of(values: impl IntoIterator<Item = Value>) -> Self {
        let mut out: Vec<Value> = Vec::new();
        for value in values {
            if !out.contains(&value) {
                out.push(value);
            }
        }
        Self::Set(out)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&Bean> {
        match self {
            Self::Object(bean) => Some(bean),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Converts a JSON document into a value. Objects carrying a `_class`
    /// hint become beans, all other objects become maps.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            JsonValue::Object(mut map) => match map.remove(TYPE_HINT_KEY) {
                Some(JsonValue::String(type_name)) => {
                    let mut bean = Bean::new(type_name);
                    for (key, value) in map {
                        bean.set(key, Self::from_json(value));
                    }
                    Self::Object(bean)
                }
                _ => Self::Map(
                    map.into_iter()
                        .map(|(k, v)| (k, Self::from_json(v)))
                        .collect(),
                ),
            },
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(i) => JsonValue::from(*i),
            Self::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::List(items) | Self::Set(items) => {
                JsonValue::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Object(bean) => {
                let mut map = JsonMap::new();
                map.insert(
                    TYPE_HINT_KEY.to_string(),
                    JsonValue::String(bean.type_name.clone()),
                );
                for (k, v) in &bean.fields {
                    map.insert(k.clone(), v.to_json());
                }
                JsonValue::Object(map)
            }
        }
    }
}

/// Bit pattern used for float equality and hashing: all NaNs are one value
/// and `-0.0` equals `0.0`.
fn float_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => float_bits(*a) == float_bits(*b),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a.len() == b.len() && a.iter().all(|v| b.contains(v)),
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Integer(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Self::Float(f) => {
                2u8.hash(state);
                float_bits(*f).hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Self::List(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            // order-insensitive, matching equality
            Self::Set(items) => {
                6u8.hash(state);
                items.len().hash(state);
            }
            Self::Map(map) => {
                7u8.hash(state);
                map.hash(state);
            }
            Self::Object(bean) => {
                8u8.hash(state);
                bean.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{}", fl)
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::List(_) | Self::Set(_) | Self::Map(_) | Self::Object(_) => {
                write!(f, "{}", self.to_json())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Bean> for Value {
    fn from(bean: Bean) -> Self {
        Self::Object(bean)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Float(3.14), Value::Float(3.14));
        assert_ne!(Value::Integer(1), Value::Integer(2));
        assert_eq!(
            Value::set_of(vec![Value::Integer(1), Value::Integer(2)]),
            Value::set_of(vec![Value::Integer(2), Value::Integer(1)])
        );
    }

    #[test]
    fn test_equal_values_hash_alike() {
        use std::collections::HashSet;

        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(-f64::NAN));

        let keys: HashSet<Value> = [
            Value::Integer(1),
            Value::Float(1.0),
            Value::Float(0.0),
            Value::Float(-0.0),
            Value::Float(f64::NAN),
            Value::Float(-f64::NAN),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_set_drops_duplicates() {
        let set = Value::set_of(vec![Value::from("a"), Value::from("b"), Value::from("a")]);
        assert_eq!(set.as_elements().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_bean_from_json_uses_type_hint() {
        let value = Value::from_json(serde_json::json!({
            "_class": "User",
            "firstname": "Dave",
            "tags": { "a": 1 }
        }));

        let bean = value.as_bean().unwrap();
        assert_eq!(bean.type_name(), "User");
        assert_eq!(bean.get("firstname"), &Value::from("Dave"));
        assert!(matches!(bean.get("tags"), Value::Map(_)));
        assert!(bean.get("missing").is_null());
        assert_eq!(Value::from_json(value.to_json()), value);
    }
}
