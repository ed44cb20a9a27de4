//! Append-only buffers filled during ingestion.
//!
//! A fillable buffer grows in fixed-size chunks so that appending never moves
//! previously written elements; [`FillableBuffer::finalize`] concatenates the chunks
//! into a single contiguous [`SharedVec`] exactly once.

use oamap_common::{Result, error::Error};
use oamap_shared_vec::SharedVec;

use crate::{
    array::{Array, ArrayData},
    dtype::{Element, ElementType},
    mask::NullMask,
    scalar::Scalar,
};

/// Default chunk size of fillable buffers, in bytes.
pub const DEFAULT_CHUNK_BYTES: usize = 8 * 1024;

/// An append-only chunked buffer of `T`.
pub struct FillableBuffer<T> {
    chunks: Vec<Vec<T>>,
    chunk_len: usize,
    len: usize,
}

impl<T: Copy> FillableBuffer<T> {
    /// Creates a buffer whose chunks hold `chunk_bytes` bytes (at least one element).
    pub fn new(chunk_bytes: usize) -> FillableBuffer<T> {
        let chunk_len = (chunk_bytes / std::mem::size_of::<T>().max(1)).max(1);
        FillableBuffer {
            chunks: Vec::new(),
            chunk_len,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn push(&mut self, value: T) {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < self.chunk_len => chunk.push(value),
            _ => {
                let mut chunk = Vec::with_capacity(self.chunk_len);
                chunk.push(value);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
    }

    pub fn last(&self) -> Option<&T> {
        self.chunks.last().and_then(|chunk| chunk.last())
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.chunks.last_mut().and_then(|chunk| chunk.last_mut())
    }

    /// Concatenates the chunks into one contiguous buffer.
    pub fn finalize(mut self) -> SharedVec<T> {
        if self.chunks.len() == 1 {
            return SharedVec::from_vec(self.chunks.pop().unwrap_or_default());
        }
        SharedVec::concat(&self.chunks)
    }
}

/// Type-erased fillable values, so that a node's element type can be chosen at runtime.
trait ErasedFillable: Send {
    fn push_scalar(&mut self, scalar: &Scalar) -> bool;

    fn push_sentinel(&mut self);

    fn len(&self) -> usize;

    fn finalize(self: Box<Self>) -> ArrayData;
}

impl<T: Element> ErasedFillable for FillableBuffer<T> {
    fn push_scalar(&mut self, scalar: &Scalar) -> bool {
        match T::from_scalar(scalar) {
            Some(value) => {
                self.push(value);
                true
            }
            None => false,
        }
    }

    fn push_sentinel(&mut self) {
        self.push(T::sentinel());
    }

    fn len(&self) -> usize {
        FillableBuffer::len(self)
    }

    fn finalize(self: Box<Self>) -> ArrayData {
        T::wrap(FillableBuffer::finalize(*self))
    }
}

/// A runtime-typed fillable array with an optional null mask.
pub struct FillableArray {
    dtype: ElementType,
    values: Box<dyn ErasedFillable>,
    nulls: Option<FillableBuffer<u8>>,
}

impl FillableArray {
    pub fn new(dtype: ElementType, nullable: bool, chunk_bytes: usize) -> FillableArray {
        let values: Box<dyn ErasedFillable> = crate::match_element_type!(dtype, T => {
            Box::new(FillableBuffer::<T>::new(chunk_bytes))
        });
        FillableArray {
            dtype,
            values,
            nulls: nullable.then(|| FillableBuffer::new(chunk_bytes)),
        }
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a value, converting it to the element type without loss.
    pub fn push_scalar(&mut self, scalar: &Scalar) -> Result<()> {
        if !self.values.push_scalar(scalar) {
            return Err(Error::invalid_arg(
                "scalar",
                format!("{scalar:?} cannot be stored as {}", self.dtype),
            ));
        }
        if let Some(nulls) = &mut self.nulls {
            nulls.push(0);
        }
        Ok(())
    }

    /// Appends the null sentinel and sets the mask.
    pub fn push_null(&mut self) -> Result<()> {
        let nulls = self.nulls.as_mut().ok_or_else(|| {
            Error::invalid_arg("value", format!("null pushed into non-nullable {}", self.dtype))
        })?;
        nulls.push(1);
        self.values.push_sentinel();
        Ok(())
    }

    /// Appends a value and sets its mask entry.
    ///
    /// Offsets streams use this instead of [`FillableArray::push_null`]: a masked
    /// boundary must still hold the running offset, since the neighboring list ends
    /// there.
    pub fn push_masked(&mut self, scalar: &Scalar) -> Result<()> {
        if self.nulls.is_none() {
            return Err(Error::invalid_arg(
                "value",
                format!("null pushed into non-nullable {}", self.dtype),
            ));
        }
        self.push_scalar(scalar)?;
        if let Some(nulls) = &mut self.nulls {
            if let Some(last) = nulls.last_mut() {
                *last = 1;
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> Result<Array> {
        let data = self.values.finalize();
        let mask = self
            .nulls
            .map(|nulls| NullMask::from_flags(nulls.finalize().iter().map(|&b| b != 0)));
        Array::new(data, mask)
    }
}
