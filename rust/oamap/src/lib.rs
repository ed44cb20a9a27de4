//! # OAMap: nested objects over flat columnar buffers
//!
//! OAMap maps arbitrarily nested, typed data (lists, records, tuples, unions and
//! pointers over numeric leaves) onto a set of flat, one-dimensional buffers, and
//! reads it back through lazily evaluated proxies without materializing the nested
//! objects.
//!
//! ## Module Organization
//!
//! * [`buffers`] - Typed arrays, null masks, fillable streams and buffer sources
//! * [`schema`] - The schema graph, its paths, JSON form and projection
//! * [`resolve`] - Binding an abstract schema to the arrays of a source
//! * [`proxy`] - Read-only views of logical values over a bound schema
//! * [`ingest`] - Type inference and buffer filling from host values
//! * [`common`] - Errors and shared helpers
//!
//! ## Getting Started
//!
//! ```ignore
//! use oamap::{HostValue, from_data};
//!
//! let root = from_data(&HostValue::from(vec![vec![3i64, 2, 1], vec![], vec![4, 5]]))?;
//! let rows = root.value()?;
//! assert_eq!(rows.at(2)?.at(1)?.as_u64(), Some(5));
//! ```

use std::sync::Arc;

pub use oamap_buffers as buffers;
pub use oamap_common as common;
pub use oamap_ingest as ingest;
pub use oamap_proxy as proxy;
pub use oamap_resolve as resolve;
pub use oamap_schema as schema;

pub use oamap_common::{Result, error::Error, error::ErrorKind};
pub use oamap_ingest::{IngestConfig, Ingested, Ingestor};
pub use oamap_proxy::{ListProxy, RecordProxy, Root, TupleProxy, Value};
pub use oamap_resolve::ResolveOptions;
pub use oamap_schema::{HostObject, HostValue, Schema, SchemaBuilder};

use oamap_buffers::Source;

/// Binds `schema` to `source` and returns its root proxy.
pub fn open(schema: &Schema, source: Arc<dyn Source>, options: ResolveOptions) -> Result<Root> {
    Root::new(oamap_resolve::resolve(schema, source, options)?)
}

/// Ingests `value` as a single row and returns the root proxy over it.
pub fn from_data(value: &HostValue) -> Result<Root> {
    from_rows(std::slice::from_ref(value))
}

/// Ingests `rows` under one inferred schema and returns the root proxy over them.
pub fn from_rows(rows: &[HostValue]) -> Result<Root> {
    let ingested = Ingestor::default().ingest_rows(rows)?;
    Root::new(ingested.resolve(ResolveOptions::default())?)
}

/// Ingests a JSON document. Strings are rejected.
pub fn from_json(value: &serde_json::Value) -> Result<Root> {
    from_data(&HostValue::from_json(value)?)
}
