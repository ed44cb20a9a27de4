//! Typed one-dimensional buffers and the buffer adapter.
//!
//! Every logical value in oamap is backed by a handful of flat, homogeneously typed
//! buffers. This crate provides:
//!
//! - [`dtype::ElementType`] and the [`dtype::Element`] trait mapping element types to
//!   Rust POD types;
//! - [`array::Array`]: an immutable, sliceable typed array with an optional
//!   [`mask::NullMask`];
//! - [`descriptor::BufferDescriptor`] and [`descriptor::load_buffer`]: the adapter that
//!   normalizes literal arrays, thunks and named lookups into validated arrays;
//! - [`source::Source`] and [`source::BufferMap`]: where named buffers come from;
//! - [`lazy::LazyBuffers`]: node-level deferred materialization with idempotent
//!   first touch;
//! - [`fillable`]: append-only chunked buffers used while ingesting host data.

pub mod array;
pub mod descriptor;
pub mod dtype;
pub mod fillable;
pub mod lazy;
pub mod mask;
pub mod scalar;
pub mod source;

pub use array::{Array, ArrayData};
pub use descriptor::{BufferDescriptor, BufferExpectation, DTypeRule, load_buffer};
pub use dtype::{Complex64, Element, ElementType, Logical};
pub use lazy::{BoundBuffer, LazyBuffers};
pub use mask::NullMask;
pub use scalar::Scalar;
pub use source::{BufferMap, FnSource, Source};

pub use oamap_shared_vec::SharedVec;
