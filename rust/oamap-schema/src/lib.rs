//! The schema tree: how flat columnar buffers compose into nested logical values.
//!
//! A [`Schema`] is an arena of [`Node`]s addressed by [`NodeId`], with a distinguished
//! root. Containment edges (list contents, record fields, tuple items, union
//! possibilities) form a tree; only pointer targets may be shared or cyclic.
//!
//! Schemas are either *abstract*, with buffers given as
//! [`BufferDescriptor`](oamap_buffers::BufferDescriptor)s, or *bound*, with every
//! buffer materialized (or deferred) by the resolver. Derived schemas remember the
//! node of the original abstract schema each of their nodes came from (see
//! [`Node::base`] and [`Schema::origin_id`]).

pub mod builder;
mod equality;
mod format;
pub mod host;
mod instance;
mod json;
pub mod node;
pub mod path;
mod projection;
pub mod schema;

pub use builder::SchemaBuilder;
pub use host::{HostObject, HostValue};
pub use node::{BufferRef, Node, NodeId, NodeKind, RuntimeTag};
pub use path::{PathNaming, PathSegment, SchemaPath};
pub use schema::{Schema, WalkOrder};
