//! Resolution: binding an abstract schema to buffers.
//!
//! The [`Resolver`] walks an abstract [`Schema`](oamap_schema::Schema), names every
//! node by its containment path, loads each node's buffers through the buffer adapter
//! and produces a bound schema in which every node has one of the forms the proxy
//! algorithm reads directly:
//!
//! | abstract | bound |
//! |---|---|
//! | `Primitive` | `Primitive`, data converted to the declared element type |
//! | `ListCount`, `ListOffset`, `ListBeginEnd` | `ListBeginEnd` over `uint64` begin/end |
//! | `UnionDense`, `UnionDenseOffset` | `UnionDenseOffset` over `uint64` tags/offsets |
//! | `Pointer` | `Pointer` over a `uint64` index |
//!
//! In lazy mode each node keeps a loader that runs on first access; in eager mode the
//! buffers are loaded during resolution and cross-node invariants are checked.

mod abstract_form;
pub mod derive;
mod options;
mod resolver;
pub mod validate;

pub use abstract_form::{as_abstract, logical_len};
pub use options::ResolveOptions;
pub use resolver::{Resolver, resolve};
