//! Element types of one-dimensional buffers.

use std::{fmt, str::FromStr};

use oamap_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

use crate::{array::ArrayData, scalar::Scalar};
use oamap_shared_vec::SharedVec;

/// The element type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// One-byte logical.
    #[serde(rename = "bool")]
    Boolean,
    #[serde(rename = "int8")]
    Int8,
    #[serde(rename = "int16")]
    Int16,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
    /// Complex double: a pair of `f64`.
    #[serde(rename = "complex128")]
    Complex128,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::Boolean,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Complex128,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Boolean => "bool",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::Complex128 => "complex128",
        }
    }

    pub fn is_integral(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            ElementType::UInt8 | ElementType::UInt16 | ElementType::UInt32 | ElementType::UInt64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, ElementType::Complex128)
    }

    /// Size of one element in bytes.
    pub fn byte_width(&self) -> usize {
        match self {
            ElementType::Boolean | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
            ElementType::Complex128 => 16,
        }
    }

    /// Inclusive integer range representable by an integral type.
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            ElementType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            ElementType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            ElementType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            ElementType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            ElementType::UInt8 => (0, u8::MAX as i128),
            ElementType::UInt16 => (0, u16::MAX as i128),
            ElementType::UInt32 => (0, u32::MAX as i128),
            ElementType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    /// Returns `true` if an integer host value fits this element type.
    ///
    /// Integral types check their range; floating and complex types admit any integer.
    pub fn admits_int(&self, value: i128) -> bool {
        match self.integer_range() {
            Some((min, max)) => min <= value && value <= max,
            None => self.is_floating() || self.is_complex(),
        }
    }

    /// Value written into masked slots.
    pub fn null_sentinel(&self) -> Scalar {
        crate::match_element_type!(*self, T => T::sentinel().to_scalar())
    }

    /// Smallest unsigned type covering `max`, if any.
    pub fn smallest_unsigned(max: i128) -> Option<ElementType> {
        [
            ElementType::UInt8,
            ElementType::UInt16,
            ElementType::UInt32,
            ElementType::UInt64,
        ]
        .into_iter()
        .find(|t| t.admits_int(max))
    }

    /// Smallest signed type covering `[min, max]`, if any.
    pub fn smallest_signed(min: i128, max: i128) -> Option<ElementType> {
        [
            ElementType::Int8,
            ElementType::Int16,
            ElementType::Int32,
            ElementType::Int64,
        ]
        .into_iter()
        .find(|t| t.admits_int(min) && t.admits_int(max))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ElementType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::invalid_format("element type", format!("unknown type '{s}'")))
    }
}

/// One-byte logical value (`0` = false, anything else = true).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Logical(pub u8);

impl Logical {
    pub fn get(&self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Logical {
    fn from(value: bool) -> Self {
        Logical(value as u8)
    }
}

/// Complex double.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub const fn new(re: f64, im: f64) -> Complex64 {
        Complex64 { re, im }
    }

    pub fn is_nan(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }
}

/// A Rust type usable as a buffer element.
pub trait Element:
    bytemuck::Pod + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const DTYPE: ElementType;

    fn to_scalar(self) -> Scalar;

    /// Converts a scalar without loss, or returns `None`.
    fn from_scalar(scalar: &Scalar) -> Option<Self>;

    fn sentinel() -> Self;

    fn wrap(values: SharedVec<Self>) -> ArrayData;

    fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>>;
}

/// Binds the Rust element type for a runtime `ElementType` and evaluates `$body`.
#[macro_export]
macro_rules! match_element_type {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::dtype::ElementType::Boolean => {
                type $t = $crate::dtype::Logical;
                $body
            }
            $crate::dtype::ElementType::Int8 => {
                type $t = i8;
                $body
            }
            $crate::dtype::ElementType::Int16 => {
                type $t = i16;
                $body
            }
            $crate::dtype::ElementType::Int32 => {
                type $t = i32;
                $body
            }
            $crate::dtype::ElementType::Int64 => {
                type $t = i64;
                $body
            }
            $crate::dtype::ElementType::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::dtype::ElementType::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::dtype::ElementType::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::dtype::ElementType::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::dtype::ElementType::Float32 => {
                type $t = f32;
                $body
            }
            $crate::dtype::ElementType::Float64 => {
                type $t = f64;
                $body
            }
            $crate::dtype::ElementType::Complex128 => {
                type $t = $crate::dtype::Complex64;
                $body
            }
        }
    };
}

macro_rules! impl_signed_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: ElementType = ElementType::$dtype;

            fn to_scalar(self) -> Scalar {
                Scalar::Int(self as i64)
            }

            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                match *scalar {
                    Scalar::Int(v) => <$ty>::try_from(v).ok(),
                    Scalar::UInt(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn sentinel() -> Self {
                <$ty>::MIN
            }

            fn wrap(values: SharedVec<Self>) -> ArrayData {
                ArrayData::$dtype(values)
            }

            fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>> {
                match data {
                    ArrayData::$dtype(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_unsigned_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: ElementType = ElementType::$dtype;

            fn to_scalar(self) -> Scalar {
                Scalar::UInt(self as u64)
            }

            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                match *scalar {
                    Scalar::Int(v) => <$ty>::try_from(v).ok(),
                    Scalar::UInt(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn sentinel() -> Self {
                <$ty>::MAX
            }

            fn wrap(values: SharedVec<Self>) -> ArrayData {
                ArrayData::$dtype(values)
            }

            fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>> {
                match data {
                    ArrayData::$dtype(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_float_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: ElementType = ElementType::$dtype;

            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                match *scalar {
                    Scalar::Int(v) => Some(v as $ty),
                    Scalar::UInt(v) => Some(v as $ty),
                    Scalar::Float(v) => Some(v as $ty),
                    _ => None,
                }
            }

            fn sentinel() -> Self {
                <$ty>::NAN
            }

            fn wrap(values: SharedVec<Self>) -> ArrayData {
                ArrayData::$dtype(values)
            }

            fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>> {
                match data {
                    ArrayData::$dtype(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_signed_element!(i8, Int8);
impl_signed_element!(i16, Int16);
impl_signed_element!(i32, Int32);
impl_signed_element!(i64, Int64);
impl_unsigned_element!(u8, UInt8);
impl_unsigned_element!(u16, UInt16);
impl_unsigned_element!(u32, UInt32);
impl_unsigned_element!(u64, UInt64);
impl_float_element!(f32, Float32);
impl_float_element!(f64, Float64);

impl Element for Logical {
    const DTYPE: ElementType = ElementType::Boolean;

    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self.get())
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match *scalar {
            Scalar::Bool(v) => Some(Logical::from(v)),
            _ => None,
        }
    }

    fn sentinel() -> Self {
        Logical(0)
    }

    fn wrap(values: SharedVec<Self>) -> ArrayData {
        ArrayData::Boolean(values)
    }

    fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>> {
        match data {
            ArrayData::Boolean(values) => Some(values),
            _ => None,
        }
    }
}

impl Element for Complex64 {
    const DTYPE: ElementType = ElementType::Complex128;

    fn to_scalar(self) -> Scalar {
        Scalar::Complex(self)
    }

    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match *scalar {
            Scalar::Int(v) => Some(Complex64::new(v as f64, 0.0)),
            Scalar::UInt(v) => Some(Complex64::new(v as f64, 0.0)),
            Scalar::Float(v) => Some(Complex64::new(v, 0.0)),
            Scalar::Complex(v) => Some(v),
            Scalar::Bool(_) => None,
        }
    }

    fn sentinel() -> Self {
        Complex64::new(f64::NAN, f64::NAN)
    }

    fn wrap(values: SharedVec<Self>) -> ArrayData {
        ArrayData::Complex128(values)
    }

    fn unwrap(data: &ArrayData) -> Option<&SharedVec<Self>> {
        match data {
            ArrayData::Complex128(values) => Some(values),
            _ => None,
        }
    }
}
