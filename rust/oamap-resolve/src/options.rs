use oamap_common::Result;
use oamap_schema::PathNaming;
use serde::{Deserialize, Serialize};

/// Options of a [`Resolver`](crate::Resolver) pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Defer loading each node's buffers until first access.
    pub lazy: bool,
    /// Check cross-node invariants after an eager pass. Ignored in lazy mode, where
    /// nothing is loaded up front.
    pub validate: bool,
    /// Prefix and delimiter of the buffer keys looked up in the source.
    pub naming: PathNaming,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            lazy: false,
            validate: true,
            naming: PathNaming::default(),
        }
    }
}

impl ResolveOptions {
    pub fn lazy() -> ResolveOptions {
        ResolveOptions::default().with_lazy(true)
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_naming(mut self, naming: PathNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.naming.validate()
    }
}
