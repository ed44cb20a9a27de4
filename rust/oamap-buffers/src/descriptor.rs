//! Buffer descriptors and the buffer adapter.
//!
//! The resolver never reads buffers directly: it hands a [`BufferDescriptor`] to
//! [`load_buffer`], which turns it into a validated [`Array`].

use std::{fmt, sync::Arc};

use oamap_common::{Result, error::Error};

use crate::{array::Array, dtype::ElementType, source::Source};

pub type ThunkFn = Arc<dyn Fn() -> Result<Array> + Send + Sync>;
pub type SourceThunkFn = Arc<dyn Fn(&dyn Source) -> Result<Array> + Send + Sync>;
pub type NodeThunkFn = Arc<dyn Fn(&dyn Source, &str) -> Result<Array> + Send + Sync>;

/// A reference to a buffer that is not necessarily loaded yet.
#[derive(Clone, Default)]
pub enum BufferDescriptor {
    /// Look the buffer up in the source under the node's canonical path key.
    #[default]
    Default,
    /// An already-constructed array, passed through.
    Array(Array),
    /// A nullary thunk.
    Thunk(ThunkFn),
    /// A thunk taking the source.
    SourceThunk(SourceThunkFn),
    /// A thunk taking the source and the node's canonical path key.
    NodeThunk(NodeThunkFn),
    /// Look the buffer up in the source under an explicit key.
    Key(String),
}

impl BufferDescriptor {
    pub fn key(key: impl Into<String>) -> BufferDescriptor {
        BufferDescriptor::Key(key.into())
    }

    pub fn thunk<F>(f: F) -> BufferDescriptor
    where
        F: Fn() -> Result<Array> + Send + Sync + 'static,
    {
        BufferDescriptor::Thunk(Arc::new(f))
    }

    pub fn source_thunk<F>(f: F) -> BufferDescriptor
    where
        F: Fn(&dyn Source) -> Result<Array> + Send + Sync + 'static,
    {
        BufferDescriptor::SourceThunk(Arc::new(f))
    }

    pub fn node_thunk<F>(f: F) -> BufferDescriptor
    where
        F: Fn(&dyn Source, &str) -> Result<Array> + Send + Sync + 'static,
    {
        BufferDescriptor::NodeThunk(Arc::new(f))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, BufferDescriptor::Default)
    }
}

impl From<Array> for BufferDescriptor {
    fn from(array: Array) -> Self {
        BufferDescriptor::Array(array)
    }
}

fn same_closure<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl PartialEq for BufferDescriptor {
    fn eq(&self, other: &BufferDescriptor) -> bool {
        match (self, other) {
            (BufferDescriptor::Default, BufferDescriptor::Default) => true,
            (BufferDescriptor::Array(a), BufferDescriptor::Array(b)) => a == b,
            (BufferDescriptor::Key(a), BufferDescriptor::Key(b)) => a == b,
            (BufferDescriptor::Thunk(a), BufferDescriptor::Thunk(b)) => same_closure(a, b),
            (BufferDescriptor::SourceThunk(a), BufferDescriptor::SourceThunk(b)) => {
                same_closure(a, b)
            }
            (BufferDescriptor::NodeThunk(a), BufferDescriptor::NodeThunk(b)) => {
                same_closure(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for BufferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferDescriptor::Default => f.write_str("Default"),
            BufferDescriptor::Array(a) => write!(f, "Array({}, len={})", a.dtype(), a.len()),
            BufferDescriptor::Thunk(_) => f.write_str("Thunk"),
            BufferDescriptor::SourceThunk(_) => f.write_str("SourceThunk"),
            BufferDescriptor::NodeThunk(_) => f.write_str("NodeThunk"),
            BufferDescriptor::Key(key) => write!(f, "Key({key:?})"),
        }
    }
}

/// Constraint on the element type of a loaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DTypeRule {
    Any,
    Integral,
    Exact(ElementType),
    /// Any integral type when the expected type is integral (converted losslessly
    /// by the caller), otherwise exactly the expected type.
    Compatible(ElementType),
}

impl DTypeRule {
    pub fn admits(&self, dtype: ElementType) -> bool {
        match *self {
            DTypeRule::Any => true,
            DTypeRule::Integral => dtype.is_integral(),
            DTypeRule::Exact(expected) => dtype == expected,
            DTypeRule::Compatible(expected) => {
                dtype == expected || (expected.is_integral() && dtype.is_integral())
            }
        }
    }
}

/// What the caller expects of a loaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferExpectation {
    pub rule: DTypeRule,
    /// Whether the buffer must carry a null mask.
    pub nullable: bool,
}

impl BufferExpectation {
    pub fn integral(nullable: bool) -> BufferExpectation {
        BufferExpectation {
            rule: DTypeRule::Integral,
            nullable,
        }
    }
}

/// Turns a descriptor into a validated array.
///
/// `key` is the canonical path key of the buffer, used for `Default` lookups, passed
/// to node thunks and reported in errors.
///
/// # Errors
///
/// - `MissingBuffer` if a keyed lookup finds nothing in `source`;
/// - `ShapeMismatch` if the element type violates the expectation's rule, or if mask
///   presence differs from the expected nullability.
pub fn load_buffer(
    descriptor: &BufferDescriptor,
    source: &dyn Source,
    key: &str,
    expectation: &BufferExpectation,
) -> Result<Array> {
    let array = match descriptor {
        BufferDescriptor::Default => source
            .fetch(key)?
            .ok_or_else(|| Error::missing_buffer(key))?,
        BufferDescriptor::Key(explicit) => source
            .fetch(explicit)?
            .ok_or_else(|| Error::missing_buffer(explicit.as_str()))?,
        BufferDescriptor::Array(array) => array.clone(),
        BufferDescriptor::Thunk(thunk) => thunk()?,
        BufferDescriptor::SourceThunk(thunk) => thunk(source)?,
        BufferDescriptor::NodeThunk(thunk) => thunk(source, key)?,
    };
    check_buffer(&array, key, expectation)?;
    Ok(array)
}

/// Validates an already-loaded array against an expectation.
pub fn check_buffer(array: &Array, key: &str, expectation: &BufferExpectation) -> Result<()> {
    if !expectation.rule.admits(array.dtype()) {
        return Err(Error::shape_mismatch(
            key,
            format!(
                "element type {} does not satisfy {:?}",
                array.dtype(),
                expectation.rule
            ),
        ));
    }
    match (expectation.nullable, array.mask().is_some()) {
        (true, false) => Err(Error::shape_mismatch(
            key,
            "nullable buffer is missing its null mask",
        )),
        (false, true) => Err(Error::shape_mismatch(
            key,
            "non-nullable buffer carries a null mask",
        )),
        _ => Ok(()),
    }
}
