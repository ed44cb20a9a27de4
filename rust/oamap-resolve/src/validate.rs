//! Cross-node invariant checks of bound schemas.
//!
//! Node-local shape checks (element types, mask presence, paired buffer lengths) run
//! as buffers load; the checks here relate a node's buffers to the logical lengths
//! of its children, so they need the whole schema materialized.

use ahash::AHashMap;
use oamap_buffers::Array;
use oamap_common::{Result, error::Error};
use oamap_schema::{NodeId, NodeKind, PathNaming, PathSegment, Schema, SchemaPath};

use crate::{abstract_form::logical_len, derive::index_values};

/// Checks the domain invariants of every reachable node of a bound schema:
///
/// - a list's `[begin, end)` lies within its contents, with `begin <= end`;
/// - a union's tags select an existing possibility and its offsets index into it;
/// - a pointer's indexes fall within its target;
/// - the children of a record or tuple have equal lengths.
///
/// Masked entries are exempt. Nodes that are not in canonical bound form are skipped.
pub fn validate_bound(schema: &Schema, naming: &PathNaming) -> Result<()> {
    let paths = schema
        .paths(naming)?
        .into_iter()
        .collect::<AHashMap<NodeId, SchemaPath>>();
    for id in schema.members() {
        let key = |segment: Option<&PathSegment>| {
            paths
                .get(&id)
                .map_or_else(|| format!("node {id}"), |path| path.buffer_key(segment))
        };
        match &schema.node(id).kind {
            NodeKind::ListBeginEnd {
                begin,
                end,
                contents,
            } => {
                let len = logical_len(schema, *contents)?;
                check_lists(begin.array()?, end.array()?, len, &key(Some(&PathSegment::ListBegin)))?;
            }
            NodeKind::UnionDenseOffset {
                tags,
                offsets,
                possibilities,
            } => {
                let lens = possibilities
                    .iter()
                    .map(|&possibility| logical_len(schema, possibility))
                    .collect::<Result<Vec<_>>>()?;
                check_union(
                    tags.array()?,
                    offsets.array()?,
                    &lens,
                    &key(Some(&PathSegment::UnionTag)),
                )?;
            }
            NodeKind::Pointer { index, target } => {
                let len = logical_len(schema, *target)?;
                check_indexes(index.array()?, len, &key(Some(&PathSegment::PointerIndex)))?;
            }
            NodeKind::Record { fields, .. } => {
                let children = fields.iter().map(|(_, child)| *child).collect::<Vec<_>>();
                check_equal_lengths(schema, &children, &key(None))?;
            }
            NodeKind::Tuple { items, .. } => check_equal_lengths(schema, items, &key(None))?,
            _ => (),
        }
    }
    Ok(())
}

fn check_lists(begin: &Array, end: &Array, contents_len: usize, key: &str) -> Result<()> {
    let begin_values = index_values(begin, key)?;
    let end_values = index_values(end, key)?;
    let contents_len = contents_len as u64;
    for (i, (&b, &e)) in begin_values.iter().zip(end_values.iter()).enumerate() {
        if begin.is_null(i) {
            continue;
        }
        if b > e || e > contents_len {
            return Err(Error::shape_mismatch(
                key,
                format!("list {i} spans [{b}, {e}) outside of 0..{contents_len}"),
            ));
        }
    }
    Ok(())
}

fn check_union(tags: &Array, offsets: &Array, lens: &[usize], key: &str) -> Result<()> {
    let tag_values = index_values(tags, key)?;
    let offset_values = index_values(offsets, key)?;
    for (i, (&tag, &offset)) in tag_values.iter().zip(offset_values.iter()).enumerate() {
        if tags.is_null(i) {
            continue;
        }
        let len = usize::try_from(tag)
            .ok()
            .and_then(|tag| lens.get(tag))
            .ok_or_else(|| {
                Error::shape_mismatch(key, format!("tag {tag} at {i} is not below {}", lens.len()))
            })?;
        if offset >= *len as u64 {
            return Err(Error::shape_mismatch(
                key,
                format!("offset {offset} at {i} is out of range for possibility {tag} of length {len}"),
            ));
        }
    }
    Ok(())
}

fn check_indexes(index: &Array, target_len: usize, key: &str) -> Result<()> {
    let values = index_values(index, key)?;
    for (i, &value) in values.iter().enumerate() {
        if !index.is_null(i) && value >= target_len as u64 {
            return Err(Error::shape_mismatch(
                key,
                format!("index {value} at {i} is out of range for a target of length {target_len}"),
            ));
        }
    }
    Ok(())
}

fn check_equal_lengths(schema: &Schema, children: &[NodeId], key: &str) -> Result<()> {
    let mut expected = None;
    for &child in children {
        let len = logical_len(schema, child)?;
        match expected {
            None => expected = Some(len),
            Some(expected) if expected != len => {
                return Err(Error::shape_mismatch(
                    key,
                    format!("children have lengths {expected} and {len}"),
                ));
            }
            Some(_) => (),
        }
    }
    Ok(())
}
