//! Immutable one-dimensional typed arrays.

use std::ops::Range;

use oamap_common::{Result, error::Error, verify_arg};
use oamap_shared_vec::SharedVec;

use crate::{
    dtype::{Complex64, Element, ElementType, Logical},
    mask::NullMask,
    scalar::Scalar,
};

/// Typed storage of an [`Array`], one variant per [`ElementType`].
#[derive(Debug, Clone)]
pub enum ArrayData {
    Boolean(SharedVec<Logical>),
    Int8(SharedVec<i8>),
    Int16(SharedVec<i16>),
    Int32(SharedVec<i32>),
    Int64(SharedVec<i64>),
    UInt8(SharedVec<u8>),
    UInt16(SharedVec<u16>),
    UInt32(SharedVec<u32>),
    UInt64(SharedVec<u64>),
    Float32(SharedVec<f32>),
    Float64(SharedVec<f64>),
    Complex128(SharedVec<Complex64>),
}

/// Evaluates `$body` with `$v` bound to the typed `SharedVec` inside an `ArrayData`.
macro_rules! dispatch_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Boolean($v) => $body,
            ArrayData::Int8($v) => $body,
            ArrayData::Int16($v) => $body,
            ArrayData::Int32($v) => $body,
            ArrayData::Int64($v) => $body,
            ArrayData::UInt8($v) => $body,
            ArrayData::UInt16($v) => $body,
            ArrayData::UInt32($v) => $body,
            ArrayData::UInt64($v) => $body,
            ArrayData::Float32($v) => $body,
            ArrayData::Float64($v) => $body,
            ArrayData::Complex128($v) => $body,
        }
    };
}

/// Like `dispatch_data!`, but rewraps the result into the same variant.
macro_rules! map_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Boolean($v) => ArrayData::Boolean($body),
            ArrayData::Int8($v) => ArrayData::Int8($body),
            ArrayData::Int16($v) => ArrayData::Int16($body),
            ArrayData::Int32($v) => ArrayData::Int32($body),
            ArrayData::Int64($v) => ArrayData::Int64($body),
            ArrayData::UInt8($v) => ArrayData::UInt8($body),
            ArrayData::UInt16($v) => ArrayData::UInt16($body),
            ArrayData::UInt32($v) => ArrayData::UInt32($body),
            ArrayData::UInt64($v) => ArrayData::UInt64($body),
            ArrayData::Float32($v) => ArrayData::Float32($body),
            ArrayData::Float64($v) => ArrayData::Float64($body),
            ArrayData::Complex128($v) => ArrayData::Complex128($body),
        }
    };
}

fn dtype_of<T: Element>(_: &SharedVec<T>) -> ElementType {
    T::DTYPE
}

impl ArrayData {
    pub fn dtype(&self) -> ElementType {
        dispatch_data!(self, v => dtype_of(v))
    }

    pub fn len(&self) -> usize {
        dispatch_data!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An immutable one-dimensional typed array with an optional null mask.
///
/// Cloning and slicing share the underlying storage. When present, the mask has
/// exactly the same length as the values; masked slots hold the element type's
/// null sentinel.
#[derive(Debug, Clone)]
pub struct Array {
    data: ArrayData,
    mask: Option<NullMask>,
}

impl Array {
    /// Creates an array, verifying that the mask (if any) matches the values length.
    pub fn new(data: ArrayData, mask: Option<NullMask>) -> Result<Array> {
        if let Some(mask) = &mask {
            verify_arg!(mask, mask.len() == data.len());
        }
        Ok(Array { data, mask })
    }

    pub fn from_vec<T: Element>(values: Vec<T>) -> Array {
        Array::from_values(SharedVec::from_vec(values))
    }

    pub fn from_values<T: Element>(values: SharedVec<T>) -> Array {
        Array {
            data: T::wrap(values),
            mask: None,
        }
    }

    /// Builds a masked array: `None` entries become sentinels with the mask set.
    pub fn from_options<T: Element>(values: Vec<Option<T>>) -> Array {
        let mask = NullMask::from_flags(values.iter().map(Option::is_none));
        let values = values
            .into_iter()
            .map(|v| v.unwrap_or_else(T::sentinel))
            .collect::<Vec<_>>();
        Array {
            data: T::wrap(SharedVec::from_vec(values)),
            mask: Some(mask),
        }
    }

    pub fn with_mask(self, mask: NullMask) -> Result<Array> {
        Array::new(self.data, Some(mask))
    }

    pub fn without_mask(self) -> Array {
        Array {
            data: self.data,
            mask: None,
        }
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn mask(&self) -> Option<&NullMask> {
        self.mask.as_ref()
    }

    pub fn dtype(&self) -> ElementType {
        self.data.dtype()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw element at `index`, or `None` when out of bounds.
    ///
    /// Masked entries return their sentinel; check [`Array::is_null`] first.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        dispatch_data!(&self.data, v => v.get(index).map(|x| x.to_scalar()))
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        self.mask
            .as_ref()
            .is_some_and(|mask| index < mask.len() && mask.is_null(index))
    }

    pub fn count_nulls(&self) -> usize {
        self.mask.as_ref().map_or(0, NullMask::count_nulls)
    }

    pub fn typed<T: Element>(&self) -> Option<&SharedVec<T>> {
        T::unwrap(&self.data)
    }

    /// Returns a view over `range` sharing storage with this array.
    pub fn slice(&self, range: Range<usize>) -> Result<Array> {
        verify_arg!(range, range.start <= range.end && range.end <= self.len());
        Ok(Array {
            data: map_data!(&self.data, v => v.slice(range.clone())),
            mask: self.mask.as_ref().map(|m| m.slice(range.clone())),
        })
    }

    /// Widens an integral array to the canonical `UInt64` index width.
    ///
    /// Copies iff the element type is not already `UInt64`. Masked entries become `0`;
    /// a negative unmasked entry fails with `ShapeMismatch`.
    pub fn to_index_array(&self, name: &str) -> Result<Array> {
        if self.dtype() == ElementType::UInt64 {
            return Ok(self.clone());
        }
        if !self.dtype().is_integral() {
            return Err(Error::shape_mismatch(
                name,
                format!("expected an integral buffer, found {}", self.dtype()),
            ));
        }
        let mask = self.mask.as_ref();
        let values: SharedVec<u64> =
            dispatch_data!(&self.data, v => convert_values(v, mask, name, 0u64)?);
        Ok(Array {
            data: ArrayData::UInt64(values),
            mask: self.mask.clone(),
        })
    }

    /// Converts an integral array to another integral type without loss.
    pub fn cast(&self, dtype: ElementType, name: &str) -> Result<Array> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        if !(self.dtype().is_integral() && dtype.is_integral()) {
            return Err(Error::shape_mismatch(
                name,
                format!("cannot convert {} to {dtype}", self.dtype()),
            ));
        }
        let mask = self.mask.as_ref();
        let data = crate::match_element_type!(dtype, D => {
            let values: SharedVec<D> =
                dispatch_data!(&self.data, v => convert_values(v, mask, name, D::sentinel())?);
            D::wrap(values)
        });
        Ok(Array {
            data,
            mask: self.mask.clone(),
        })
    }

    /// Raw bytes of the values, in native byte order.
    pub fn as_bytes(&self) -> &[u8] {
        dispatch_data!(&self.data, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Collects entries as scalars, with `None` for masked entries.
    pub fn to_scalars(&self) -> Vec<Option<Scalar>> {
        (0..self.len())
            .map(|i| if self.is_null(i) { None } else { self.get(i) })
            .collect()
    }
}

fn convert_values<S: Element, D: Element>(
    src: &SharedVec<S>,
    mask: Option<&NullMask>,
    name: &str,
    masked: D,
) -> Result<SharedVec<D>> {
    src.iter()
        .enumerate()
        .map(|(i, v)| {
            if mask.is_some_and(|m| m.is_null(i)) {
                return Ok(masked);
            }
            D::from_scalar(&v.to_scalar()).ok_or_else(|| {
                Error::shape_mismatch(
                    name,
                    format!("value {v:?} at {i} does not fit {}", D::DTYPE),
                )
            })
        })
        .collect()
}

impl PartialEq for Array {
    /// Elementwise equality; masked entries compare equal regardless of their content.
    fn eq(&self, other: &Array) -> bool {
        if self.dtype() != other.dtype() || self.len() != other.len() {
            return false;
        }
        let nulls_equal = (0..self.len()).all(|i| self.is_null(i) == other.is_null(i));
        nulls_equal
            && (0..self.len()).all(|i| self.is_null(i) || self.get(i) == other.get(i))
    }
}
