//! Deferred materialization of a node's buffers.

use std::{fmt, sync::{Arc, OnceLock}};

use oamap_common::{Result, error::Error};

use crate::array::Array;

pub type LoaderFn = Box<dyn Fn() -> Result<Vec<Array>> + Send + Sync>;

/// The group of arrays backing one bound schema node.
///
/// A group is either ready (arrays already materialized) or pending, in which case
/// the loader runs on first access and its result replaces the pending state; every
/// later access sees the arrays. The loader must be idempotent: concurrent first
/// touches may run it more than once, and only one result is kept.
pub struct LazyBuffers {
    label: String,
    cell: OnceLock<Vec<Array>>,
    loader: Option<LoaderFn>,
}

impl LazyBuffers {
    pub fn ready(label: impl Into<String>, arrays: Vec<Array>) -> Arc<LazyBuffers> {
        Arc::new(LazyBuffers {
            label: label.into(),
            cell: OnceLock::from(arrays),
            loader: None,
        })
    }

    pub fn pending(label: impl Into<String>, loader: LoaderFn) -> Arc<LazyBuffers> {
        Arc::new(LazyBuffers {
            label: label.into(),
            cell: OnceLock::new(),
            loader: Some(loader),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the arrays, running the loader on first access.
    pub fn arrays(&self) -> Result<&[Array]> {
        if let Some(arrays) = self.cell.get() {
            return Ok(arrays);
        }
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| Error::invalid_operation(format!("no loader for '{}'", self.label)))?;
        log::trace!("materializing buffers of '{}'", self.label);
        let arrays = loader()?;
        let _ = self.cell.set(arrays);
        Ok(self.cell.get().expect("materialized arrays"))
    }
}

impl fmt::Debug for LazyBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBuffers")
            .field("label", &self.label)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

/// One array of a [`LazyBuffers`] group.
#[derive(Debug, Clone)]
pub struct BoundBuffer {
    group: Arc<LazyBuffers>,
    slot: usize,
}

impl BoundBuffer {
    pub fn new(group: Arc<LazyBuffers>, slot: usize) -> BoundBuffer {
        BoundBuffer { group, slot }
    }

    pub fn group(&self) -> &Arc<LazyBuffers> {
        &self.group
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn is_materialized(&self) -> bool {
        self.group.is_materialized()
    }

    pub fn array(&self) -> Result<&Array> {
        let arrays = self.group.arrays()?;
        arrays.get(self.slot).ok_or_else(|| {
            Error::invalid_operation(format!(
                "buffer slot {} missing in '{}'",
                self.slot,
                self.group.label()
            ))
        })
    }
}

impl PartialEq for BoundBuffer {
    /// Same group and slot, or elementwise-equal arrays. Arrays that fail to
    /// materialize never compare equal.
    fn eq(&self, other: &BoundBuffer) -> bool {
        if Arc::ptr_eq(&self.group, &other.group) && self.slot == other.slot {
            return true;
        }
        match (self.array(), other.array()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
