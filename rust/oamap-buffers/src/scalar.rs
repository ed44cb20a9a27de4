//! A single buffer element lifted out of its typed storage.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::dtype::Complex64;

/// A single element read from an [`Array`](crate::Array).
#[derive(Debug, Clone, Copy)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    /// Returns the value as a non-negative index, if it is one.
    pub fn as_index(&self) -> Option<u64> {
        match *self {
            Scalar::Int(v) => u64::try_from(v).ok(),
            Scalar::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Int(v) => Some(v as f64),
            Scalar::UInt(v) => Some(v as f64),
            Scalar::Float(v) => Some(v),
            Scalar::Bool(_) | Scalar::Complex(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Scalar::Bool(v) => serde_json::Value::Bool(v),
            Scalar::Int(v) => serde_json::Value::from(v),
            Scalar::UInt(v) => serde_json::Value::from(v),
            Scalar::Float(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Complex(v) => serde_json::json!({
                "real": serde_json::Number::from_f64(v.re),
                "imag": serde_json::Number::from_f64(v.im),
            }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => 1,
            Scalar::Complex(_) => 2,
        }
    }

    /// Total order: booleans, then real numbers by value, then complex numbers
    /// by `(re, im)`. Integers compare exactly; floats use a total float order.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (*self, *other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(&b),
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(&b),
            (Scalar::UInt(a), Scalar::UInt(b)) => a.cmp(&b),
            (Scalar::Int(a), Scalar::UInt(b)) => (a as i128).cmp(&(b as i128)),
            (Scalar::UInt(a), Scalar::Int(b)) => (a as i128).cmp(&(b as i128)),
            (Scalar::Complex(a), Scalar::Complex(b)) => (OrderedFloat(a.re), OrderedFloat(a.im))
                .cmp(&(OrderedFloat(b.re), OrderedFloat(b.im))),
            (a, b) if a.rank() != b.rank() => a.rank().cmp(&b.rank()),
            (a, b) => {
                let a = OrderedFloat(a.as_f64().unwrap_or(f64::NAN));
                let b = OrderedFloat(b.as_f64().unwrap_or(f64::NAN));
                a.cmp(&b)
            }
        }
    }
}

impl PartialEq for Scalar {
    /// Numeric equality across integer representations; an integer never equals a
    /// float, mirroring how the two serialize to JSON.
    fn eq(&self, other: &Scalar) -> bool {
        match (*self, *other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::UInt(a), Scalar::UInt(b)) => a == b,
            (Scalar::Int(a), Scalar::UInt(b)) | (Scalar::UInt(b), Scalar::Int(a)) => {
                a as i128 == b as i128
            }
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            (Scalar::Complex(a), Scalar::Complex(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::UInt(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<Complex64> for Scalar {
    fn from(value: Complex64) -> Self {
        Scalar::Complex(value)
    }
}
