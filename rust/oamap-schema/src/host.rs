//! The host value model consumed by ingestion and `is_instance` checks.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use oamap_buffers::Complex64;
use oamap_common::{Result, error::Error};

/// A nested value supplied by the host application.
///
/// Integers are arbitrary-width up to `i128` so that inference can detect values that
/// exceed 64-bit element types.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(Complex64),
    List(Vec<HostValue>),
    /// A mapping from field name to value.
    Mapping(Vec<(String, HostValue)>),
    /// A positional tuple.
    Tuple(Vec<HostValue>),
    /// A tuple with field names.
    NamedTuple {
        name: String,
        fields: Vec<String>,
        values: Vec<HostValue>,
    },
    /// A plain object; its fields are its public attributes.
    Object(HostObject),
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn mapping<I, K>(entries: I) -> HostValue
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: Into<String>,
    {
        HostValue::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Positional items of a tuple or named tuple.
    pub fn tuple_items(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Tuple(values) | HostValue::NamedTuple { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Returns `true` for values that have named fields: mappings, named tuples and
    /// objects.
    pub fn has_fields(&self) -> bool {
        matches!(
            self,
            HostValue::Mapping(_) | HostValue::NamedTuple { .. } | HostValue::Object(_)
        )
    }

    /// Calls `f` with the named fields of a mapping, named tuple or object.
    ///
    /// Returns `None` for values without named fields.
    pub fn with_fields<R>(&self, f: impl FnOnce(&[(&str, &HostValue)]) -> R) -> Option<R> {
        match self {
            HostValue::Mapping(entries) => {
                let fields = entries
                    .iter()
                    .map(|(k, v)| (k.as_str(), v))
                    .collect::<Vec<_>>();
                Some(f(&fields))
            }
            HostValue::NamedTuple { fields, values, .. } => {
                let fields = fields
                    .iter()
                    .map(String::as_str)
                    .zip(values.iter())
                    .collect::<Vec<_>>();
                Some(f(&fields))
            }
            HostValue::Object(object) => Some(object.with_attributes(f)),
            _ => None,
        }
    }

    /// Returns a copy of the named field, if present.
    pub fn field(&self, name: &str) -> Option<HostValue> {
        self.with_fields(|fields| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).clone())
        })
        .flatten()
    }

    /// The class name of an object or named tuple.
    pub fn class_name(&self) -> Option<String> {
        match self {
            HostValue::NamedTuple { name, .. } => Some(name.clone()),
            HostValue::Object(object) => Some(object.class_name().to_string()),
            _ => None,
        }
    }

    /// Converts a JSON document: arrays become lists and objects become mappings.
    ///
    /// Strings have no counterpart among numeric buffers and are rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<HostValue> {
        use serde_json::Value;
        let host = match value {
            Value::Null => HostValue::Null,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HostValue::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    HostValue::Int(u as i128)
                } else {
                    HostValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => {
                return Err(Error::invalid_arg(
                    "value",
                    format!("string \"{s}\" is not a supported host value"),
                ));
            }
            Value::Array(items) => HostValue::List(
                items
                    .iter()
                    .map(HostValue::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => HostValue::Mapping(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), HostValue::from_json(v)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(host)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value as i128)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<Complex64> for HostValue {
    fn from(value: Complex64) -> Self {
        HostValue::Complex(value)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(values: Vec<T>) -> Self {
        HostValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

struct ObjectInner {
    class_name: String,
    attributes: RwLock<Vec<(String, HostValue)>>,
}

/// A shared, identity-bearing host object with mutable attributes.
///
/// Clones refer to the same object; equality is identity. Attributes whose name starts
/// with `_` are private and not exposed as fields.
#[derive(Clone)]
pub struct HostObject(Arc<ObjectInner>);

impl HostObject {
    pub fn new(class_name: impl Into<String>) -> HostObject {
        HostObject(Arc::new(ObjectInner {
            class_name: class_name.into(),
            attributes: RwLock::new(Vec::new()),
        }))
    }

    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    /// A stable identity for the lifetime of the object.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Sets (or replaces) an attribute.
    pub fn set(&self, name: impl Into<String>, value: HostValue) {
        let name = name.into();
        let mut attributes = self
            .0
            .attributes
            .write()
            .unwrap_or_else(|e| e.into_inner());
        match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => attributes.push((name, value)),
        }
    }

    pub fn with_attribute(self, name: impl Into<String>, value: HostValue) -> HostObject {
        self.set(name, value);
        self
    }

    /// Calls `f` with the public attributes in definition order.
    pub fn with_attributes<R>(&self, f: impl FnOnce(&[(&str, &HostValue)]) -> R) -> R {
        let attributes = self
            .0
            .attributes
            .read()
            .unwrap_or_else(|e| e.into_inner());
        let public = attributes
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.as_str(), v))
            .collect::<Vec<_>>();
        f(&public)
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class_name(), self.id())
    }
}

impl From<HostObject> for HostValue {
    fn from(object: HostObject) -> Self {
        HostValue::Object(object)
    }
}
