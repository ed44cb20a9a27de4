use oamap_buffers::fillable::DEFAULT_CHUNK_BYTES;
use oamap_common::{Result, verify_arg};
use oamap_schema::PathNaming;
use serde::{Deserialize, Serialize};

/// Configuration of an [`Ingestor`](crate::Ingestor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunk size of the fillable streams, in bytes.
    pub chunk_bytes: usize,
    /// Prefix and delimiter of the emitted buffer keys.
    pub naming: PathNaming,
}

impl IngestConfig {
    /// Smallest accepted chunk size.
    pub const MIN_CHUNK_BYTES: usize = 64;
    /// Largest accepted chunk size.
    pub const MAX_CHUNK_BYTES: usize = 64 * 1024 * 1024;

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes;
        self
    }

    pub fn with_naming(mut self, naming: PathNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(
            chunk_bytes,
            (Self::MIN_CHUNK_BYTES..=Self::MAX_CHUNK_BYTES).contains(&self.chunk_bytes)
        );
        self.naming.validate()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            naming: PathNaming::default(),
        }
    }
}
