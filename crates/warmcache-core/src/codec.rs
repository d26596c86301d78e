//! Value model and its text encoding.
//!
//! Every node is written with an explicit type tag (`{"t":"int","v":1}`), so the
//! decoder never has to guess between lookalike shapes and application types come
//! back through their [`Reconstruct`] implementation instead of by class identity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A structured cache value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Object(Object),
}

/// An application value rebuilt through its [`Reconstruct`] hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub fields: IndexMap<String, Value>,
}

/// Hook for application types that persist as a tagged field map.
pub trait Reconstruct: Sized {
    /// Recorded next to the fields at encode time and checked on the way back.
    const TYPE_TAG: &'static str;

    fn to_fields(&self) -> IndexMap<String, Value>;

    fn from_fields(fields: IndexMap<String, Value>) -> Result<Self, CodecError>;
}

/// Containers (lists, maps, objects) a value may nest. Each level costs up to
/// three levels of tagged JSON, and the decoder stops at 128.
pub const MAX_NESTING: usize = 32;

/// Encode a value into entry text
pub fn encode(value: &Value) -> Result<String, CodecError> {
    value.check_storable(0)?;
    Ok(serde_json::to_string(value)?)
}

/// Decode entry text back into a value
pub fn decode(text: &str) -> Result<Value, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::corrupt(e.to_string()))
}

/// Remove a required field from a field map, for use in [`Reconstruct::from_fields`].
pub fn take_field(fields: &mut IndexMap<String, Value>, name: &str) -> Result<Value, CodecError> {
    fields
        .shift_remove(name)
        .ok_or_else(|| CodecError::MissingField(name.to_string()))
}

impl Value {
    pub fn object<T: Reconstruct>(item: &T) -> Value {
        Value::Object(Object {
            type_tag: T::TYPE_TAG.to_string(),
            fields: item.to_fields(),
        })
    }

    /// Rebuild an application type, dispatching on the recorded type tag.
    pub fn reconstruct<T: Reconstruct>(self) -> Result<T, CodecError> {
        match self {
            Value::Object(object) if object.type_tag == T::TYPE_TAG => {
                T::from_fields(object.fields)
            }
            Value::Object(object) => Err(CodecError::TypeMismatch {
                expected: T::TYPE_TAG.to_string(),
                found: object.type_tag,
            }),
            other => Err(CodecError::TypeMismatch {
                expected: T::TYPE_TAG.to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a map entry or an object field
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(name),
            Value::Object(object) => object.fields.get(name),
            _ => None,
        }
    }

    /// Numeric reading used by counters. Anything that isn't a number
    /// (or a string holding an integer) counts as zero.
    pub fn as_counter(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(f) if f.is_finite() => *f as i64,
            Value::Str(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Plain JSON view, used for display. Objects keep their tag under `@type`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut out = serde_json::Map::new();
                out.insert("@type".to_string(), Json::String(object.type_tag.clone()));
                for (k, v) in &object.fields {
                    out.insert(k.clone(), v.to_json());
                }
                Json::Object(out)
            }
        }
    }

    /// Reject what would encode but never decode: non-finite floats and
    /// nesting past [`MAX_NESTING`]. `depth` counts enclosing containers.
    fn check_storable(&self, depth: usize) -> Result<(), CodecError> {
        let children: Box<dyn Iterator<Item = &Value> + '_> = match self {
            Value::Float(f) if !f.is_finite() => return Err(CodecError::NonFiniteFloat(*f)),
            Value::List(items) => Box::new(items.iter()),
            Value::Map(map) => Box::new(map.values()),
            Value::Object(object) => Box::new(object.fields.values()),
            _ => return Ok(()),
        };

        if depth >= MAX_NESTING {
            return Err(CodecError::TooDeep { limit: MAX_NESTING });
        }
        children.into_iter().try_for_each(|child| child.check_storable(depth + 1))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(item: Option<T>) -> Self {
        item.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<IndexMap<String, T>> for Value {
    fn from(map: IndexMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
