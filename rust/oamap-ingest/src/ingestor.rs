use std::sync::Arc;

use oamap_buffers::{BufferMap, Source};
use oamap_common::Result;
use oamap_resolve::{ResolveOptions, Resolver};
use oamap_schema::{HostValue, PathNaming, Schema, SchemaBuilder};

use crate::{config::IngestConfig, fill::fill, infer::infer_rows, lower::lower_with};

/// Converts host values into an abstract schema and its buffers.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Ingestor {
        Ingestor { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Infers the concrete schema admitting every one of `rows`.
    ///
    /// # Errors
    ///
    /// `CyclicInput` for self-referencing objects, `TypeUnresolvable` for positions
    /// holding only nulls or empty lists.
    pub fn infer_schema(&self, rows: &[HostValue]) -> Result<Schema> {
        let intermediate = infer_rows(rows)?;
        let mut builder = SchemaBuilder::new();
        let root = lower_with(&intermediate, &mut builder, &self.config.naming)?;
        builder.finish(root)
    }

    /// Ingests a single value as a one-row dataset.
    pub fn ingest(&self, value: &HostValue) -> Result<Ingested> {
        self.ingest_rows(std::slice::from_ref(value))
    }

    /// Infers a schema for `rows` and fills its buffers, one root entry per row.
    pub fn ingest_rows(&self, rows: &[HostValue]) -> Result<Ingested> {
        self.config.validate()?;
        log::debug!("ingesting {} rows", rows.len());
        let schema = self.infer_schema(rows)?;
        let buffers = self.fill(&schema, rows)?;
        Ok(Ingested {
            schema,
            buffers,
            naming: self.config.naming.clone(),
        })
    }

    /// Fills the buffers of a caller-supplied abstract schema with `rows`.
    pub fn fill(&self, schema: &Schema, rows: &[HostValue]) -> Result<BufferMap> {
        fill(schema, rows, &self.config)
    }
}

/// The outcome of an ingest: an abstract schema and the buffers it names.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub schema: Schema,
    pub buffers: BufferMap,
    naming: PathNaming,
}

impl Ingested {
    /// Naming the buffer keys were emitted under.
    pub fn naming(&self) -> &PathNaming {
        &self.naming
    }

    /// Binds the schema to the ingested buffers. The naming of `options` is replaced
    /// by the one used while ingesting.
    pub fn resolve(&self, options: ResolveOptions) -> Result<Arc<Schema>> {
        let source: Arc<dyn Source> = Arc::new(self.buffers.clone());
        Resolver::new(source, options.with_naming(self.naming.clone())).resolve(&self.schema)
    }

    pub fn into_parts(self) -> (Schema, BufferMap) {
        (self.schema, self.buffers)
    }
}
