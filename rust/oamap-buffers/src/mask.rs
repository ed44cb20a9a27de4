//! Per-entry null masks.

use std::ops::Range;

use oamap_shared_vec::SharedVec;

/// A per-entry null mask accompanying a nullable buffer.
///
/// Three storage methods are used:
/// - `AllValid`: no entry is null, nothing is stored;
/// - `AllNull`: every entry is null, nothing is stored;
/// - `Bytes`: one byte per entry, `1` marks a null entry and `0` a valid one.
#[derive(Debug, Clone)]
pub enum NullMask {
    AllValid(usize),
    AllNull(usize),
    Bytes(SharedVec<u8>),
}

impl NullMask {
    /// Builds a mask from per-entry null flags, choosing the trivial forms when possible.
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> NullMask {
        let bytes = flags.into_iter().map(u8::from).collect::<Vec<_>>();
        let nulls = bytes.iter().filter(|&&b| b != 0).count();
        if nulls == 0 {
            NullMask::AllValid(bytes.len())
        } else if nulls == bytes.len() {
            NullMask::AllNull(bytes.len())
        } else {
            NullMask::Bytes(SharedVec::from_vec(bytes))
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            NullMask::AllValid(len) | NullMask::AllNull(len) => *len,
            NullMask::Bytes(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the entry at `index` is null.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds of a `Bytes` mask.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            NullMask::AllValid(_) => false,
            NullMask::AllNull(_) => true,
            NullMask::Bytes(bytes) => bytes[index] != 0,
        }
    }

    pub fn count_nulls(&self) -> usize {
        match self {
            NullMask::AllValid(_) => 0,
            NullMask::AllNull(len) => *len,
            NullMask::Bytes(bytes) => bytes.iter().filter(|&&b| b != 0).count(),
        }
    }

    /// Returns a view of the mask over `range`, sharing storage.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the mask length.
    pub fn slice(&self, range: Range<usize>) -> NullMask {
        assert!(range.start <= range.end && range.end <= self.len());
        match self {
            NullMask::AllValid(_) => NullMask::AllValid(range.len()),
            NullMask::AllNull(_) => NullMask::AllNull(range.len()),
            NullMask::Bytes(bytes) => NullMask::Bytes(bytes.slice(range)),
        }
    }

    /// Iterates per-entry null flags.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(|i| self.is_null(i))
    }
}

impl PartialEq for NullMask {
    fn eq(&self, other: &NullMask) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}
