//! Ingestion of host values into flat buffers.
//!
//! Ingestion runs in two passes over the host data:
//!
//! 1. **Inference** ([`infer`]) folds every visited sub-value into an
//!    [`Intermediate`] type and [`lower`] turns the result into a concrete abstract
//!    schema, choosing the narrowest element types that hold the observed values.
//! 2. **Fill** ([`fill`]) walks the data and the schema in lock-step, appending to one
//!    fillable stream per buffer key.
//!
//! [`Ingestor`] runs both passes and returns the schema with its [`BufferMap`]
//! (`oamap_buffers::BufferMap`), ready to be resolved.

mod config;
mod fill;
mod infer;
mod ingestor;
mod intermediate;
mod lower;

pub use config::IngestConfig;
pub use fill::fill;
pub use infer::{infer, infer_rows};
pub use ingestor::{Ingested, Ingestor};
pub use intermediate::{Intermediate, IntermediateKind, NumberRange, unify};
pub use lower::{lower, lower_with};

#[cfg(test)]
mod tests;
