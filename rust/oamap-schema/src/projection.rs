//! Projection: pruning a schema down to the buffers needed for a set of nodes.
//!
//! A node is kept iff it is required or a required node is reachable from it. Record
//! fields and tuple items that lead to nothing required are dropped, as are union
//! possibilities. A list, union or pointer that is itself required but whose contents
//! project to nothing becomes a `UInt64` primitive over its primary buffer (counts,
//! offsets, begin, tags or index), so its length or tags can still be read. A required
//! record or tuple requires its whole subtree. The root is always kept.
//!
//! Required nodes are named by their origin id (see [`Schema::origin_id`]), so that
//! the same set can be applied to a schema and to its projections. Default buffer
//! descriptors are pinned to their original path keys, since positions may shift.

use ahash::{AHashMap, AHashSet};
use oamap_buffers::{BufferDescriptor, ElementType};
use oamap_common::{Result, error::Error};

use crate::{
    builder::SchemaBuilder,
    node::{BufferRef, Node, NodeId, NodeKind},
    path::{PathNaming, PathSegment, SchemaPath},
    schema::Schema,
};

impl Schema {
    /// Projects the schema onto the nodes whose origin ids are in `required`, under the
    /// default path naming.
    pub fn project(&self, required: impl IntoIterator<Item = NodeId>) -> Result<Schema> {
        self.project_with(required, &PathNaming::default())
    }

    pub fn project_with(
        &self,
        required: impl IntoIterator<Item = NodeId>,
        naming: &PathNaming,
    ) -> Result<Schema> {
        let required = required.into_iter().collect::<AHashSet<_>>();
        let members = self.members();
        let mut local = members
            .iter()
            .copied()
            .filter(|&id| required.contains(&self.origin_id(id)))
            .collect::<AHashSet<_>>();
        let structural = local
            .iter()
            .copied()
            .filter(|&id| self.node(id).kind.is_structural())
            .collect::<Vec<_>>();
        for id in structural {
            collect_owned(self, id, &mut local);
        }

        let mut projector = Projector {
            schema: self,
            required: local,
            paths: self.paths(naming)?.into_iter().collect(),
            builder: SchemaBuilder::new(),
            memo: AHashMap::new(),
            reaches: AHashMap::new(),
            pending: Vec::new(),
        };
        let root = projector
            .project(self.root(), true)?
            .ok_or_else(|| Error::invalid_operation("projection dropped the root"))?;
        projector.link_pointers()?;
        projector
            .builder
            .finish_derived(root, self.origin_or_self())
    }
}

fn collect_owned(schema: &Schema, id: NodeId, out: &mut AHashSet<NodeId>) {
    out.insert(id);
    for (_, child) in schema.node(id).kind.owned_children() {
        collect_owned(schema, child, out);
    }
}

struct Projector<'a> {
    schema: &'a Schema,
    required: AHashSet<NodeId>,
    paths: AHashMap<NodeId, SchemaPath>,
    builder: SchemaBuilder,
    memo: AHashMap<NodeId, NodeId>,
    reaches: AHashMap<NodeId, bool>,
    /// Projected pointers awaiting their target: `(new pointer, old target)`.
    pending: Vec<(NodeId, NodeId)>,
}

impl Projector<'_> {
    fn reaches_required(&mut self, id: NodeId) -> bool {
        if let Some(&reaches) = self.reaches.get(&id) {
            return reaches;
        }
        let reaches = self.schema.contains_any(id, &self.required);
        self.reaches.insert(id, reaches);
        reaches
    }

    /// Projects the subtree at `id`; `keep` forces a (minimal) result.
    fn project(&mut self, id: NodeId, keep: bool) -> Result<Option<NodeId>> {
        if let Some(&projected) = self.memo.get(&id) {
            return Ok(Some(projected));
        }
        let required = self.required.contains(&id);
        if !keep && !required && !self.reaches_required(id) {
            return Ok(None);
        }

        let node = self.schema.node(id);
        let base = Some(self.schema.origin_id(id));
        let kind = match &node.kind {
            NodeKind::Primitive { dtype, data } => NodeKind::Primitive {
                dtype: *dtype,
                data: self.pin(id, None, data),
            },
            NodeKind::ListCount { counts, contents } => match self.project(*contents, false)? {
                Some(contents) => NodeKind::ListCount {
                    counts: self.pin(id, Some(PathSegment::ListCount), counts),
                    contents,
                },
                None => self.fallback(id),
            },
            NodeKind::ListOffset { offsets, contents } => {
                match self.project(*contents, false)? {
                    Some(contents) => NodeKind::ListOffset {
                        offsets: self.pin(id, Some(PathSegment::ListOffset), offsets),
                        contents,
                    },
                    None => self.fallback(id),
                }
            }
            NodeKind::ListBeginEnd {
                begin,
                end,
                contents,
            } => match self.project(*contents, false)? {
                Some(contents) => NodeKind::ListBeginEnd {
                    begin: self.pin(id, Some(PathSegment::ListBegin), begin),
                    end: self.pin(id, Some(PathSegment::ListEnd), end),
                    contents,
                },
                None => self.fallback(id),
            },
            NodeKind::Record {
                name,
                runtime,
                fields,
            } => {
                let mut kept = Vec::with_capacity(fields.len());
                for (field, child) in fields {
                    if let Some(child) = self.project(*child, false)? {
                        kept.push((field.clone(), child));
                    }
                }
                if kept.is_empty() && !keep && !required {
                    return Ok(None);
                }
                NodeKind::Record {
                    name: name.clone(),
                    runtime: runtime.clone(),
                    fields: kept,
                }
            }
            NodeKind::Tuple { runtime, items } => {
                let mut kept = Vec::with_capacity(items.len());
                for child in items {
                    if let Some(child) = self.project(*child, false)? {
                        kept.push(child);
                    }
                }
                if kept.is_empty() && !keep && !required {
                    return Ok(None);
                }
                NodeKind::Tuple {
                    runtime: runtime.clone(),
                    items: kept,
                }
            }
            NodeKind::UnionDense {
                tags,
                possibilities,
            } => match self.possibilities(possibilities)?.as_slice() {
                [] => self.fallback(id),
                [single] if !required => {
                    self.memo.insert(id, *single);
                    return Ok(Some(*single));
                }
                kept => NodeKind::UnionDense {
                    tags: self.pin(id, Some(PathSegment::UnionTag), tags),
                    possibilities: kept.to_vec(),
                },
            },
            NodeKind::UnionDenseOffset {
                tags,
                offsets,
                possibilities,
            } => match self.possibilities(possibilities)?.as_slice() {
                [] => self.fallback(id),
                [single] if !required => {
                    self.memo.insert(id, *single);
                    return Ok(Some(*single));
                }
                kept => NodeKind::UnionDenseOffset {
                    tags: self.pin(id, Some(PathSegment::UnionTag), tags),
                    offsets: self.pin(id, Some(PathSegment::UnionOffset), offsets),
                    possibilities: kept.to_vec(),
                },
            },
            NodeKind::Pointer { index, target } => {
                let target = *target;
                if self.memo.contains_key(&target)
                    || target == self.schema.root()
                    || self.reaches_required(target)
                {
                    let index = self.pin(id, Some(PathSegment::PointerIndex), index);
                    let pointer = self.builder.add(
                        Node::new(
                            NodeKind::Pointer {
                                index,
                                target: NodeId::invalid(),
                            },
                            node.nullable,
                        )
                        .with_base(base),
                    );
                    self.pending.push((pointer, target));
                    self.memo.insert(id, pointer);
                    return Ok(Some(pointer));
                }
                self.fallback(id)
            }
        };
        let projected = self.builder.add(Node::new(kind, node.nullable).with_base(base));
        self.memo.insert(id, projected);
        Ok(Some(projected))
    }

    fn possibilities(&mut self, possibilities: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut kept = Vec::with_capacity(possibilities.len());
        for &possibility in possibilities {
            if let Some(projected) = self.project(possibility, false)? {
                kept.push(projected);
            }
        }
        Ok(kept)
    }

    /// A primitive over the primary buffer of a list, union or pointer.
    fn fallback(&self, id: NodeId) -> NodeKind {
        let kind = &self.schema.node(id).kind;
        let data = match kind.primary_buffer() {
            Some((segment, buffer)) => self.pin(id, segment, buffer),
            None => BufferRef::default(),
        };
        NodeKind::Primitive {
            dtype: ElementType::UInt64,
            data,
        }
    }

    fn pin(&self, id: NodeId, segment: Option<PathSegment>, buffer: &BufferRef) -> BufferRef {
        match (buffer, self.paths.get(&id)) {
            (BufferRef::Descriptor(BufferDescriptor::Default), Some(path)) => {
                BufferDescriptor::key(path.buffer_key(segment.as_ref())).into()
            }
            _ => buffer.clone(),
        }
    }

    fn link_pointers(&mut self) -> Result<()> {
        while let Some((pointer, target)) = self.pending.pop() {
            let projected = match self.memo.get(&target) {
                Some(&projected) => projected,
                None => self
                    .project(target, true)?
                    .ok_or_else(|| Error::invalid_operation("pointer target was dropped"))?,
            };
            self.builder.set_pointer_target(pointer, projected)?;
        }
        Ok(())
    }
}
