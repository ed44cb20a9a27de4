//! Proxies: lazily evaluated views of logical values over a bound schema.
//!
//! A proxy holds a shared reference to the bound [`Schema`](oamap_schema::Schema), a
//! node id and a logical index. Nothing is copied out of the buffers until a leaf is
//! read; lists, records and tuples are returned as further proxies.
//!
//! ```text
//! Primitive        -> Null | Bool | Int | UInt | Float | Complex
//! ListBeginEnd     -> Null | List(contents, begin[i]..end[i])
//! Record / Tuple   -> Record | Tuple (fields read at the same index)
//! UnionDenseOffset -> Null | possibilities[tag[i]] at offset[i]
//! Pointer          -> Null | target at index[i]
//! ```
//!
//! Pointer access performs one dereference per call, so cyclic data is safe to walk
//! as long as the caller decides when to stop.

mod access;
pub mod list;
pub mod record;
pub mod root;
pub mod value;

pub use list::{ListIter, ListProxy};
pub use record::{RecordProxy, TupleProxy};
pub use root::Root;
pub use value::Value;

#[cfg(test)]
mod tests;
