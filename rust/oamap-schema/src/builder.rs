//! Construction of schema arenas.

use std::sync::Arc;

use ahash::AHashSet;
use itertools::Itertools;
use oamap_buffers::ElementType;
use oamap_common::{Result, error::Error};

use crate::{
    equality::structurally_equal,
    node::{BufferRef, Node, NodeId, NodeKind, RuntimeTag},
    schema::Schema,
};

/// A builder of [`Schema`] arenas.
///
/// Children are added before their parents; each constructor returns the id of the
/// new node. Cyclic pointer graphs are built with [`SchemaBuilder::pointer_placeholder`]
/// and [`SchemaBuilder::set_pointer_target`], or with [`SchemaBuilder::reserve`] and
/// [`SchemaBuilder::define`].
///
/// Unnamed records are named `Record-<k>` from a counter owned by the builder.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<Option<Node>>,
    record_counter: usize,
}

impl SchemaBuilder {
    pub fn new() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node added earlier, or `None` for reserved slots.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize()).and_then(Option::as_ref)
    }

    /// Adds a fully formed node.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    /// Reserves an id for a node defined later with [`SchemaBuilder::define`].
    pub fn reserve(&mut self) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(None);
        id
    }

    /// Defines a previously reserved node.
    pub fn define(&mut self, id: NodeId, node: Node) -> Result<()> {
        match self.nodes.get_mut(id.as_usize()) {
            Some(slot @ None) => {
                *slot = Some(node);
                Ok(())
            }
            Some(Some(_)) => Err(Error::invalid_arg("id", format!("node {id} already defined"))),
            None => Err(Error::invalid_arg("id", format!("node {id} was not reserved"))),
        }
    }

    pub fn primitive(&mut self, dtype: ElementType) -> NodeId {
        self.primitive_with(dtype, BufferRef::default(), false)
    }

    pub fn primitive_with(
        &mut self,
        dtype: ElementType,
        data: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let data = data.into();
        self.add(Node::new(NodeKind::Primitive { dtype, data }, nullable))
    }

    pub fn list_count(
        &mut self,
        contents: NodeId,
        counts: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let counts = counts.into();
        self.add(Node::new(NodeKind::ListCount { counts, contents }, nullable))
    }

    /// A non-nullable list with default offsets.
    pub fn list_offset(&mut self, contents: NodeId) -> NodeId {
        self.list_offset_with(contents, BufferRef::default(), false)
    }

    pub fn list_offset_with(
        &mut self,
        contents: NodeId,
        offsets: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let offsets = offsets.into();
        self.add(Node::new(NodeKind::ListOffset { offsets, contents }, nullable))
    }

    pub fn list_begin_end(
        &mut self,
        contents: NodeId,
        begin: impl Into<BufferRef>,
        end: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let kind = NodeKind::ListBeginEnd {
            begin: begin.into(),
            end: end.into(),
            contents,
        };
        self.add(Node::new(kind, nullable))
    }

    /// Adds a record named `Record-<k>`.
    pub fn record(&mut self, fields: Vec<(String, NodeId)>) -> Result<NodeId> {
        self.record_with(None, None, fields)
    }

    pub fn named_record(
        &mut self,
        name: impl Into<String>,
        fields: Vec<(String, NodeId)>,
    ) -> Result<NodeId> {
        self.record_with(Some(name.into()), None, fields)
    }

    /// Adds a record.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if field names are not unique.
    pub fn record_with(
        &mut self,
        name: Option<String>,
        runtime: Option<RuntimeTag>,
        fields: Vec<(String, NodeId)>,
    ) -> Result<NodeId> {
        let mut seen = AHashSet::with_capacity(fields.len());
        if let Some((duplicate, _)) = fields.iter().find(|(name, _)| !seen.insert(name.as_str())) {
            return Err(Error::invalid_arg(
                "fields",
                format!("duplicate field name '{duplicate}'"),
            ));
        }
        let name = name.unwrap_or_else(|| self.next_record_name());
        let kind = NodeKind::Record {
            name,
            runtime,
            fields,
        };
        Ok(self.add(Node::new(kind, false)))
    }

    pub fn tuple(&mut self, items: Vec<NodeId>) -> NodeId {
        self.tuple_with(None, items)
    }

    pub fn tuple_with(&mut self, runtime: Option<RuntimeTag>, items: Vec<NodeId>) -> NodeId {
        self.add(Node::new(NodeKind::Tuple { runtime, items }, false))
    }

    /// Adds a union with possibilities exactly as given.
    pub fn union_dense(
        &mut self,
        possibilities: Vec<NodeId>,
        tags: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let tags = tags.into();
        self.add(Node::new(
            NodeKind::UnionDense {
                tags,
                possibilities,
            },
            nullable,
        ))
    }

    pub fn union_dense_offset(
        &mut self,
        possibilities: Vec<NodeId>,
        tags: impl Into<BufferRef>,
        offsets: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let kind = NodeKind::UnionDenseOffset {
            tags: tags.into(),
            offsets: offsets.into(),
            possibilities,
        };
        self.add(Node::new(kind, nullable))
    }

    /// Adds the canonical union of `possibilities`.
    ///
    /// Nested unions are flattened (a nullable nested union makes the result
    /// nullable), possibilities are sorted in canonical kind order and structural
    /// duplicates are removed. A single remaining possibility is returned instead of
    /// a union; if the union is nullable, a nullable copy of it is added.
    pub fn union_of(&mut self, possibilities: Vec<NodeId>, nullable: bool) -> Result<NodeId> {
        let mut nullable = nullable;
        let mut flat = Vec::with_capacity(possibilities.len());
        for id in possibilities {
            self.flatten_union(id, &mut flat, &mut nullable)?;
        }

        let sorted = flat
            .into_iter()
            .map(|id| Ok((self.canonical_rank(id)?, id)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .sorted_by_key(|(rank, _)| *rank)
            .map(|(_, id)| id)
            .collect::<Vec<_>>();

        let mut distinct: Vec<NodeId> = Vec::with_capacity(sorted.len());
        for id in sorted {
            let duplicate = distinct
                .iter()
                .any(|&kept| structurally_equal(&self.nodes[..], kept, &self.nodes[..], id));
            if !duplicate {
                distinct.push(id);
            }
        }
        log::trace!("canonical union of {} possibilities", distinct.len());

        if distinct.is_empty() {
            return Err(Error::invalid_arg("possibilities", "a union needs a possibility"));
        }
        if distinct.len() > 1 {
            return Ok(self.union_dense(distinct, BufferRef::default(), nullable));
        }
        let single = distinct[0];
        let node = self.defined(single)?;
        if !nullable || node.nullable {
            Ok(single)
        } else if node.kind.is_structural() {
            Ok(self.union_dense(distinct, BufferRef::default(), true))
        } else {
            let copy = Node {
                nullable: true,
                ..node.clone()
            };
            Ok(self.add(copy))
        }
    }

    /// Adds a pointer whose target is set later with
    /// [`SchemaBuilder::set_pointer_target`].
    pub fn pointer_placeholder(&mut self, index: impl Into<BufferRef>, nullable: bool) -> NodeId {
        self.pointer(NodeId::invalid(), index, nullable)
    }

    pub fn pointer(
        &mut self,
        target: NodeId,
        index: impl Into<BufferRef>,
        nullable: bool,
    ) -> NodeId {
        let index = index.into();
        self.add(Node::new(NodeKind::Pointer { index, target }, nullable))
    }

    pub fn set_pointer_target(&mut self, pointer: NodeId, new_target: NodeId) -> Result<()> {
        match self.nodes.get_mut(pointer.as_usize()).and_then(Option::as_mut) {
            Some(Node {
                kind: NodeKind::Pointer { target, .. },
                ..
            }) => {
                *target = new_target;
                Ok(())
            }
            _ => Err(Error::invalid_arg(
                "pointer",
                format!("node {pointer} is not a pointer"),
            )),
        }
    }

    /// Finishes an abstract schema rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if a reserved node was never defined, a child id is
    /// out of range, a pointer target is unset or equal to the pointer itself, or a
    /// record or tuple is marked nullable.
    pub fn finish(self, root: NodeId) -> Result<Schema> {
        let nodes = self.validated(root)?;
        Ok(Schema::from_parts(nodes, root, None))
    }

    /// Finishes a schema derived from `origin`; node `base` links refer to `origin`.
    pub fn finish_derived(self, root: NodeId, origin: Arc<Schema>) -> Result<Schema> {
        let nodes = self.validated(root)?;
        Ok(Schema::from_parts(nodes, root, Some(origin)))
    }

    fn validated(self, root: NodeId) -> Result<Vec<Node>> {
        let len = self.nodes.len();
        if root.as_usize() >= len {
            return Err(Error::invalid_arg("root", format!("node {root} does not exist")));
        }
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                node.ok_or_else(|| {
                    Error::invalid_arg("nodes", format!("node {i} was reserved but not defined"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (i, node) in nodes.iter().enumerate() {
            if let NodeKind::Pointer { target, .. } = &node.kind {
                if !target.is_valid() {
                    return Err(Error::invalid_arg(
                        "pointer",
                        format!("target of pointer {i} is not set"),
                    ));
                }
                if target.as_usize() == i {
                    return Err(Error::invalid_arg(
                        "pointer",
                        format!("pointer {i} targets itself"),
                    ));
                }
            }
            if node.kind.is_structural() && node.nullable {
                return Err(Error::invalid_arg(
                    "nullable",
                    format!("{} {i} cannot be nullable", node.kind.name()),
                ));
            }
            if let Some(child) = node.kind.children().into_iter().find(|c| c.as_usize() >= len) {
                return Err(Error::invalid_arg(
                    "children",
                    format!("node {i} refers to missing node {child}"),
                ));
            }
        }
        Ok(nodes)
    }

    fn next_record_name(&mut self) -> String {
        let name = format!("Record-{}", self.record_counter);
        self.record_counter += 1;
        name
    }

    fn defined(&self, id: NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| Error::invalid_arg("id", format!("node {id} is not defined")))
    }

    fn flatten_union(&self, id: NodeId, flat: &mut Vec<NodeId>, nullable: &mut bool) -> Result<()> {
        let node = self.defined(id)?;
        match &node.kind {
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => {
                *nullable |= node.nullable;
                for &possibility in possibilities {
                    self.flatten_union(possibility, flat, nullable)?;
                }
            }
            _ => flat.push(id),
        }
        Ok(())
    }

    /// Canonical possibility order: primitives by element type, then lists, unions,
    /// records, tuples and pointers.
    fn canonical_rank(&self, id: NodeId) -> Result<(u8, Option<ElementType>)> {
        let rank = match &self.defined(id)?.kind {
            NodeKind::Primitive { dtype, .. } => (0, Some(*dtype)),
            NodeKind::ListCount { .. }
            | NodeKind::ListOffset { .. }
            | NodeKind::ListBeginEnd { .. } => (1, None),
            NodeKind::UnionDense { .. } | NodeKind::UnionDenseOffset { .. } => (2, None),
            NodeKind::Record { .. } => (3, None),
            NodeKind::Tuple { .. } => (4, None),
            NodeKind::Pointer { .. } => (5, None),
        };
        Ok(rank)
    }
}
