//! Sources of named buffers.

use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
};

use oamap_common::Result;
use serde::{Deserialize, Serialize};

use crate::{array::Array, dtype::ElementType};

/// A provider of named buffers, queried by canonical path key.
///
/// Returns `Ok(None)` when the key is unknown; the resolver turns that into a
/// `MissingBuffer` error carrying the key.
pub trait Source: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Option<Array>>;
}

impl<S> Source for HashMap<String, Array, S>
where
    S: BuildHasher + Send + Sync,
{
    fn fetch(&self, key: &str) -> Result<Option<Array>> {
        Ok(self.get(key).cloned())
    }
}

impl Source for ahash::AHashMap<String, Array> {
    fn fetch(&self, key: &str) -> Result<Option<Array>> {
        Ok(self.get(key).cloned())
    }
}

impl Source for BTreeMap<String, Array> {
    fn fetch(&self, key: &str) -> Result<Option<Array>> {
        Ok(self.get(key).cloned())
    }
}

/// A source backed by a callable `(key) -> array`.
pub struct FnSource<F>(pub F);

impl<F> Source for FnSource<F>
where
    F: Fn(&str) -> Result<Option<Array>> + Send + Sync,
{
    fn fetch(&self, key: &str) -> Result<Option<Array>> {
        (self.0)(key)
    }
}

/// An ordered map from canonical path key to buffer.
///
/// This is the outbound buffer-map contract: every buffer produced by ingestion,
/// keyed by its node path, ready to be persisted or computed over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferMap(BTreeMap<String, Array>);

impl BufferMap {
    pub fn new() -> BufferMap {
        BufferMap::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, array: Array) -> Option<Array> {
        self.0.insert(key.into(), array)
    }

    pub fn get(&self, key: &str) -> Option<&Array> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Describes every buffer by key, element type, length and nullability.
    ///
    /// Together with the raw bytes of each array this is sufficient to reload the map.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.0
            .iter()
            .map(|(key, array)| ManifestEntry {
                key: key.clone(),
                dtype: array.dtype(),
                len: array.len(),
                nullable: array.mask().is_some(),
            })
            .collect()
    }

    pub fn manifest_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.manifest())?)
    }
}

impl Source for BufferMap {
    fn fetch(&self, key: &str) -> Result<Option<Array>> {
        Ok(self.0.get(key).cloned())
    }
}

impl FromIterator<(String, Array)> for BufferMap {
    fn from_iter<I: IntoIterator<Item = (String, Array)>>(iter: I) -> Self {
        BufferMap(iter.into_iter().collect())
    }
}

/// One line of a [`BufferMap::manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub dtype: ElementType,
    pub len: usize,
    pub nullable: bool,
}
