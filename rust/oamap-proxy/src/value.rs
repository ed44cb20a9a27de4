//! Logical values read through proxies, with JSON-consistent equality and a total
//! order.

use std::cmp::Ordering;

use oamap_buffers::{Complex64, Scalar};
use oamap_common::{Result, error::Error};

use crate::{
    list::ListProxy,
    record::{RecordProxy, TupleProxy},
};

/// One logical value: a leaf scalar, a null, or a proxy over nested data.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
    List(ListProxy),
    Record(RecordProxy),
    Tuple(TupleProxy),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => u64::try_from(v).ok(),
            Value::UInt(v) => Some(v),
            _ => None,
        }
    }

    /// Any real number as a double.
    pub fn as_f64(&self) -> Option<f64> {
        self.scalar().and_then(|scalar| scalar.as_f64())
    }

    pub fn as_list(&self) -> Option<&ListProxy> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordProxy> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleProxy> {
        match self {
            Value::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    /// Element `index` of a list (negative from the end) or item `index` of a tuple.
    pub fn at(&self, index: i64) -> Result<Value> {
        match self {
            Value::List(list) => list.get(index),
            Value::Tuple(tuple) => {
                let position = usize::try_from(index)
                    .map_err(|_| Error::index_out_of_range(index, tuple.len()))?;
                tuple.get(position)
            }
            other => Err(Error::invalid_operation(format!(
                "indexing a {} value",
                other.kind_name()
            ))),
        }
    }

    /// Field `name` of a record.
    pub fn field(&self, name: &str) -> Result<Value> {
        match self {
            Value::Record(record) => record.get(name),
            other => Err(Error::invalid_operation(format!(
                "field access on a {} value",
                other.kind_name()
            ))),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Serializes the value, reading every nested buffer it spans.
    ///
    /// Lists and tuples become arrays, records objects, complex numbers
    /// `{"real", "imag"}` objects; non-finite floats become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Value::Null => Ok(serde_json::Value::Null),
            Value::List(list) => list.to_json(),
            Value::Record(record) => record.to_json(),
            Value::Tuple(tuple) => tuple.to_json(),
            scalar => Ok(scalar
                .scalar()
                .map_or(serde_json::Value::Null, |s| s.to_json())),
        }
    }

    /// Equality of the JSON forms, computed without building them.
    pub fn equals(&self, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => record_eq(a, b),
            (a, b) if a.is_sequence() && b.is_sequence() => {
                let (a, b) = (a.elements()?, b.elements()?);
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(&b) {
                    if !x.equals(y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (a, b) if a.is_container() || b.is_container() => Ok(false),
            (a, b) => Ok(a.scalar_json() == b.scalar_json()),
        }
    }

    /// Total order consistent with [`Value::equals`].
    ///
    /// Nulls first, then booleans, real numbers by value (integers before an equal
    /// float), complex numbers, lists and tuples lexicographically, and records:
    /// more fields first, then field values in field order.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        let (rank_a, rank_b) = (self.rank(), other.rank());
        if rank_a != rank_b {
            return Ok(rank_a.cmp(&rank_b));
        }
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => record_cmp(a, b),
            (a, b) if a.is_sequence() => {
                let (a, b) = (a.elements()?, b.elements()?);
                for (x, y) in a.iter().zip(&b) {
                    let ordering = x.compare(y)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.scalar(), b.scalar()) {
                (Some(x), Some(y)) if rank_a != 0 => Ok(x
                    .total_cmp(&y)
                    .then_with(|| a.is_float().cmp(&b.is_float()))),
                _ => Ok(Ordering::Equal),
            },
        }
    }

    fn scalar(&self) -> Option<Scalar> {
        match *self {
            Value::Bool(v) => Some(Scalar::Bool(v)),
            Value::Int(v) => Some(Scalar::Int(v)),
            Value::UInt(v) => Some(Scalar::UInt(v)),
            Value::Float(v) => Some(Scalar::Float(v)),
            Value::Complex(v) => Some(Scalar::Complex(v)),
            _ => None,
        }
    }

    fn scalar_json(&self) -> serde_json::Value {
        self.scalar()
            .map_or(serde_json::Value::Null, |scalar| scalar.to_json())
    }

    fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    fn is_sequence(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_))
    }

    fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_) | Value::Record(_))
    }

    fn elements(&self) -> Result<Vec<Value>> {
        match self {
            Value::List(list) => list.to_vec(),
            Value::Tuple(tuple) => tuple.items(),
            _ => Ok(Vec::new()),
        }
    }

    /// Order class; non-finite floats serialize as `null` and rank with it.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Float(v) if !v.is_finite() => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => 2,
            Value::Complex(_) => 3,
            Value::List(_) | Value::Tuple(_) => 4,
            Value::Record(_) => 5,
        }
    }
}

fn record_eq(a: &RecordProxy, b: &RecordProxy) -> Result<bool> {
    if a.len() != b.len() || !a.field_names().all(|name| b.has_field(name)) {
        return Ok(false);
    }
    for (name, value) in a.fields()? {
        if !value.equals(&b.get(&name)?)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn record_cmp(a: &RecordProxy, b: &RecordProxy) -> Result<Ordering> {
    let by_count = b.len().cmp(&a.len());
    if by_count != Ordering::Equal {
        return Ok(by_count);
    }
    if !a.field_names().all(|name| b.has_field(name)) {
        let mut names_a = a.field_names().collect::<Vec<_>>();
        let mut names_b = b.field_names().collect::<Vec<_>>();
        names_a.sort_unstable();
        names_b.sort_unstable();
        return Ok(names_a.cmp(&names_b));
    }
    for (name, value) in a.fields()? {
        let ordering = value.compare(&b.get(&name)?)?;
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

impl PartialEq for Value {
    /// Values are equal iff their JSON forms are; a failing buffer read compares
    /// unequal.
    fn eq(&self, other: &Value) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

macro_rules! impl_proxy_cmp {
    ($proxy:ty, $variant:ident) => {
        impl PartialEq for $proxy {
            fn eq(&self, other: &$proxy) -> bool {
                Value::$variant(self.clone()) == Value::$variant(other.clone())
            }
        }

        impl PartialOrd for $proxy {
            fn partial_cmp(&self, other: &$proxy) -> Option<Ordering> {
                Value::$variant(self.clone()).partial_cmp(&Value::$variant(other.clone()))
            }
        }
    };
}

impl_proxy_cmp!(ListProxy, List);
impl_proxy_cmp!(RecordProxy, Record);
impl_proxy_cmp!(TupleProxy, Tuple);

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Int(v) => Value::Int(v),
            Scalar::UInt(v) => Value::UInt(v),
            Scalar::Float(v) => Value::Float(v),
            Scalar::Complex(v) => Value::Complex(v),
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

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}
