//! An immutable, cheaply cloneable and sliceable view over a shared buffer.
//!
//! `SharedVec<T>` is the storage unit behind every one-dimensional array in oamap.
//! Cloning and slicing never copy elements: a slice is a new `(offset, len)` window
//! over the same `Arc<[T]>` allocation. This is what allows a list offsets buffer of
//! length `N + 1` to be exposed as two overlapping, non-owning views
//! `offsets[..N]` (begin) and `offsets[1..]` (end).

use std::fmt;
use std::ops::{Deref, RangeBounds};
use std::sync::Arc;

/// An immutable, cheaply cloneable and sliceable shared buffer view.
#[derive(Clone)]
pub struct SharedVec<T> {
    inner: Arc<[T]>,
    offset: usize,
    len: usize,
}

impl<T> SharedVec<T> {
    /// Takes ownership of `vec` without copying its elements more than once.
    pub fn from_vec(vec: Vec<T>) -> Self {
        let len = vec.len();
        SharedVec {
            inner: Arc::from(vec),
            offset: 0,
            len,
        }
    }

    /// Returns an empty view.
    pub fn empty() -> Self {
        SharedVec::from_vec(Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            Some(&self.inner[self.offset + index])
        } else {
            None
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.inner[self.offset..self.offset + self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Returns a sub-view of this view.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice<R>(&self, range: R) -> Self
    where
        R: RangeBounds<usize>,
    {
        use std::ops::Bound::*;
        let start = match range.start_bound() {
            Included(&n) => n,
            Excluded(&n) => n + 1,
            Unbounded => 0,
        };
        let end = match range.end_bound() {
            Included(&n) => n + 1,
            Excluded(&n) => n,
            Unbounded => self.len,
        };
        assert!(start <= end && end <= self.len, "slice out of bounds");
        SharedVec {
            inner: self.inner.clone(),
            offset: self.offset + start,
            len: end - start,
        }
    }

    /// Splits an `N + 1` element boundary buffer into the overlapping `N`-element
    /// views `(self[..N], self[1..])`.
    ///
    /// Returns `None` for an empty view, which has no boundaries at all.
    pub fn boundary_views(&self) -> Option<(Self, Self)> {
        if self.len == 0 {
            return None;
        }
        Some((self.slice(..self.len - 1), self.slice(1..)))
    }

    /// Returns `true` when both views share the same allocation and window.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            && self.offset == other.offset
            && self.len == other.len
    }
}

impl<T: Clone> SharedVec<T> {
    /// Concatenates a sequence of chunks into a single contiguous allocation.
    pub fn concat<C: AsRef<[T]>>(chunks: &[C]) -> Self {
        let total = chunks.iter().map(|c| c.as_ref().len()).sum();
        let mut vec = Vec::with_capacity(total);
        for chunk in chunks {
            vec.extend_from_slice(chunk.as_ref());
        }
        SharedVec::from_vec(vec)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T> Deref for SharedVec<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> AsRef<[T]> for SharedVec<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq> PartialEq for SharedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.as_slice() == other.as_slice()
    }
}

impl<T> Default for SharedVec<T> {
    fn default() -> Self {
        SharedVec::empty()
    }
}

impl<T> From<Vec<T>> for SharedVec<T> {
    fn from(vec: Vec<T>) -> Self {
        SharedVec::from_vec(vec)
    }
}

impl<T: Clone> From<&[T]> for SharedVec<T> {
    fn from(slice: &[T]) -> Self {
        SharedVec::from_vec(slice.to_vec())
    }
}

impl<T> FromIterator<T> for SharedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        SharedVec::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a SharedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_shares_storage() {
        let shared = SharedVec::from_vec(vec![1, 2, 3, 4, 5]);
        let sub = shared.slice(1..4);
        assert_eq!(&*sub, &[2, 3, 4]);
        assert_eq!(sub.slice(1..).as_slice(), &[3, 4]);
        assert!(Arc::ptr_eq(&shared.inner, &sub.inner));
    }

    #[test]
    fn boundary_views_overlap() {
        let offsets = SharedVec::from_vec(vec![0u64, 3, 3, 5]);
        let (begin, end) = offsets.boundary_views().unwrap();
        assert_eq!(begin.as_slice(), &[0, 3, 3]);
        assert_eq!(end.as_slice(), &[3, 3, 5]);

        let single = SharedVec::from_vec(vec![0u64]);
        let (begin, end) = single.boundary_views().unwrap();
        assert!(begin.is_empty() && end.is_empty());

        assert!(SharedVec::<u64>::empty().boundary_views().is_none());
    }

    #[test]
    fn concat_chunks() {
        let chunks = vec![vec![1u8, 2], vec![], vec![3]];
        let joined = SharedVec::concat(&chunks);
        assert_eq!(joined.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn equality_is_elementwise() {
        let a = SharedVec::from_vec(vec![1, 2, 3]);
        let b = SharedVec::from_vec(vec![0, 1, 2, 3]).slice(1..);
        assert_eq!(a, b);
        assert_ne!(a, b.slice(..2));
        assert_eq!(SharedVec::<i32>::default(), SharedVec::empty());
    }
}
