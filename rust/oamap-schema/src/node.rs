//! Schema nodes and the buffers they reference.

use oamap_buffers::{Array, BoundBuffer, BufferDescriptor, ElementType};
use oamap_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

use crate::path::PathSegment;

/// Identifier of a node within one schema arena.
///
/// A dense integer starting from zero; the node with id `k` is the `k`-th node pushed
/// into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const INVALID_ID: u32 = u32::MAX;

    pub const fn invalid() -> NodeId {
        NodeId(Self::INVALID_ID)
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID_ID
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        assert!(u32::try_from(value).is_ok());
        NodeId(value as u32)
    }
}

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        value.as_usize()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A buffer referenced by a node: either a descriptor awaiting resolution or a
/// buffer bound by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferRef {
    Descriptor(BufferDescriptor),
    Bound(BoundBuffer),
}

impl BufferRef {
    pub fn is_bound(&self) -> bool {
        matches!(self, BufferRef::Bound(_))
    }

    pub fn descriptor(&self) -> Option<&BufferDescriptor> {
        match self {
            BufferRef::Descriptor(descriptor) => Some(descriptor),
            BufferRef::Bound(_) => None,
        }
    }

    /// Returns the array behind this reference, materializing a bound buffer on first
    /// access. Literal array descriptors are returned as is.
    pub fn array(&self) -> Result<&Array> {
        match self {
            BufferRef::Bound(bound) => bound.array(),
            BufferRef::Descriptor(BufferDescriptor::Array(array)) => Ok(array),
            BufferRef::Descriptor(descriptor) => Err(Error::invalid_operation(format!(
                "buffer {descriptor:?} is not bound"
            ))),
        }
    }
}

impl Default for BufferRef {
    fn default() -> Self {
        BufferRef::Descriptor(BufferDescriptor::Default)
    }
}

impl From<BufferDescriptor> for BufferRef {
    fn from(descriptor: BufferDescriptor) -> Self {
        BufferRef::Descriptor(descriptor)
    }
}

impl From<Array> for BufferRef {
    fn from(array: Array) -> Self {
        BufferRef::Descriptor(BufferDescriptor::Array(array))
    }
}

impl From<BoundBuffer> for BufferRef {
    fn from(bound: BoundBuffer) -> Self {
        BufferRef::Bound(bound)
    }
}

/// Host class information carried by records and tuples: the class (or named tuple)
/// name and its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeTag {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RuntimeTag {
    pub fn new(name: impl Into<String>) -> RuntimeTag {
        RuntimeTag {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

/// The closed set of schema node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A leaf of numeric (or logical) values.
    Primitive { dtype: ElementType, data: BufferRef },
    /// A list given by per-entry child counts.
    ListCount { counts: BufferRef, contents: NodeId },
    /// A list given by `N + 1` cumulative offsets.
    ListOffset { offsets: BufferRef, contents: NodeId },
    /// A list given by parallel begin and end positions; the canonical bound form.
    ListBeginEnd {
        begin: BufferRef,
        end: BufferRef,
        contents: NodeId,
    },
    Record {
        name: String,
        runtime: Option<RuntimeTag>,
        fields: Vec<(String, NodeId)>,
    },
    Tuple {
        runtime: Option<RuntimeTag>,
        items: Vec<NodeId>,
    },
    /// A union selecting a possibility per entry; the position within the
    /// possibility is the entry's rank among entries with the same tag.
    UnionDense {
        tags: BufferRef,
        possibilities: Vec<NodeId>,
    },
    /// A union with explicit positions within the selected possibility; the canonical
    /// bound form.
    UnionDenseOffset {
        tags: BufferRef,
        offsets: BufferRef,
        possibilities: Vec<NodeId>,
    },
    /// An index into the logical domain of a shared target node.
    Pointer { index: BufferRef, target: NodeId },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Primitive { .. } => "Primitive",
            NodeKind::ListCount { .. } => "ListCount",
            NodeKind::ListOffset { .. } => "ListOffset",
            NodeKind::ListBeginEnd { .. } => "ListBeginEnd",
            NodeKind::Record { .. } => "Record",
            NodeKind::Tuple { .. } => "Tuple",
            NodeKind::UnionDense { .. } => "UnionDense",
            NodeKind::UnionDenseOffset { .. } => "UnionDenseOffset",
            NodeKind::Pointer { .. } => "Pointer",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeKind::ListCount { .. } | NodeKind::ListOffset { .. } | NodeKind::ListBeginEnd { .. }
        )
    }

    pub fn is_union(&self) -> bool {
        matches!(
            self,
            NodeKind::UnionDense { .. } | NodeKind::UnionDenseOffset { .. }
        )
    }

    /// Returns `true` for kinds that carry no buffer of their own.
    pub fn is_structural(&self) -> bool {
        matches!(self, NodeKind::Record { .. } | NodeKind::Tuple { .. })
    }

    /// Returns `true` for the kinds the proxy algorithm reads directly.
    pub fn is_canonical_bound_form(&self) -> bool {
        !matches!(
            self,
            NodeKind::ListCount { .. } | NodeKind::ListOffset { .. } | NodeKind::UnionDense { .. }
        )
    }

    /// Children owned through containment, with the path segment leading to each.
    ///
    /// A pointer owns nothing: its target is a shared reference.
    pub fn owned_children(&self) -> Vec<(PathSegment, NodeId)> {
        match self {
            NodeKind::Primitive { .. } | NodeKind::Pointer { .. } => Vec::new(),
            NodeKind::ListCount { contents, .. }
            | NodeKind::ListOffset { contents, .. }
            | NodeKind::ListBeginEnd { contents, .. } => vec![(PathSegment::ListData, *contents)],
            NodeKind::Record { fields, .. } => fields
                .iter()
                .map(|(name, id)| (PathSegment::RecordField(name.clone()), *id))
                .collect(),
            NodeKind::Tuple { items, .. } => items
                .iter()
                .enumerate()
                .map(|(i, id)| (PathSegment::TupleIndex(i), *id))
                .collect(),
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => possibilities
                .iter()
                .enumerate()
                .map(|(i, id)| (PathSegment::UnionData(i), *id))
                .collect(),
        }
    }

    /// All outgoing edges, including a pointer's target.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Pointer { target, .. } => vec![*target],
            _ => self.owned_children().into_iter().map(|(_, id)| id).collect(),
        }
    }

    /// Buffers of this node with the segment appended to the node path to form each
    /// buffer's key; `None` means the node path itself.
    pub fn buffers(&self) -> Vec<(Option<PathSegment>, &BufferRef)> {
        match self {
            NodeKind::Primitive { data, .. } => vec![(None, data)],
            NodeKind::ListCount { counts, .. } => vec![(Some(PathSegment::ListCount), counts)],
            NodeKind::ListOffset { offsets, .. } => {
                vec![(Some(PathSegment::ListOffset), offsets)]
            }
            NodeKind::ListBeginEnd { begin, end, .. } => vec![
                (Some(PathSegment::ListBegin), begin),
                (Some(PathSegment::ListEnd), end),
            ],
            NodeKind::Record { .. } | NodeKind::Tuple { .. } => Vec::new(),
            NodeKind::UnionDense { tags, .. } => vec![(Some(PathSegment::UnionTag), tags)],
            NodeKind::UnionDenseOffset { tags, offsets, .. } => vec![
                (Some(PathSegment::UnionTag), tags),
                (Some(PathSegment::UnionOffset), offsets),
            ],
            NodeKind::Pointer { index, .. } => vec![(Some(PathSegment::PointerIndex), index)],
        }
    }

    /// Mutable access to the buffers of this node, in the order of
    /// [`NodeKind::buffers`].
    pub fn buffers_mut(&mut self) -> Vec<&mut BufferRef> {
        match self {
            NodeKind::Primitive { data, .. } => vec![data],
            NodeKind::ListCount { counts, .. } => vec![counts],
            NodeKind::ListOffset { offsets, .. } => vec![offsets],
            NodeKind::ListBeginEnd { begin, end, .. } => vec![begin, end],
            NodeKind::Record { .. } | NodeKind::Tuple { .. } => Vec::new(),
            NodeKind::UnionDense { tags, .. } => vec![tags],
            NodeKind::UnionDenseOffset { tags, offsets, .. } => vec![tags, offsets],
            NodeKind::Pointer { index, .. } => vec![index],
        }
    }

    /// The buffer whose length is the node's logical length and which carries the
    /// node's null mask.
    pub fn primary_buffer(&self) -> Option<(Option<PathSegment>, &BufferRef)> {
        self.buffers().into_iter().next()
    }

    /// Rewrites every outgoing edge, including a pointer's target.
    pub fn map_children(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        match self {
            NodeKind::Primitive { .. } => (),
            NodeKind::ListCount { contents, .. }
            | NodeKind::ListOffset { contents, .. }
            | NodeKind::ListBeginEnd { contents, .. } => *contents = f(*contents),
            NodeKind::Record { fields, .. } => {
                for (_, id) in fields.iter_mut() {
                    *id = f(*id);
                }
            }
            NodeKind::Tuple { items, .. } => {
                for id in items.iter_mut() {
                    *id = f(*id);
                }
            }
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => {
                for id in possibilities.iter_mut() {
                    *id = f(*id);
                }
            }
            NodeKind::Pointer { target, .. } => *target = f(*target),
        }
    }
}

/// A schema node: its kind, nullability and derivation link.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Whether the primary buffer may carry a null mask. Always `false` for records
    /// and tuples, whose fields carry their own nullability.
    pub nullable: bool,
    /// The node of the origin schema this node was derived from.
    pub base: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind, nullable: bool) -> Node {
        Node {
            kind,
            nullable,
            base: None,
        }
    }

    pub fn with_base(mut self, base: Option<NodeId>) -> Node {
        self.base = base;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn base(&self) -> Option<NodeId> {
        self.base
    }
}
