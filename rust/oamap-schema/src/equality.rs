//! Structural equality of schema subtrees.
//!
//! Two nodes are equal when they have the same kind, nullability, buffer references,
//! record names and runtime tags, and pairwise-equal children. `base` links are
//! ignored. Pairs already under comparison are assumed equal, which makes the check
//! terminate on cyclic pointer graphs.

use ahash::AHashSet;

use crate::node::{Node, NodeId, NodeKind};

/// Read access to an arena of nodes, possibly with reserved (undefined) slots.
pub(crate) trait NodeLookup {
    fn lookup(&self, id: NodeId) -> Option<&Node>;
}

impl NodeLookup for [Node] {
    fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.get(id.as_usize())
    }
}

impl NodeLookup for [Option<Node>] {
    fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.get(id.as_usize()).and_then(Option::as_ref)
    }
}

pub(crate) fn structurally_equal<A, B>(a: &A, a_id: NodeId, b: &B, b_id: NodeId) -> bool
where
    A: NodeLookup + ?Sized,
    B: NodeLookup + ?Sized,
{
    let mut assumed = AHashSet::new();
    NodePairs { a, b }.equal(a_id, b_id, &mut assumed)
}

struct NodePairs<'a, A: ?Sized, B: ?Sized> {
    a: &'a A,
    b: &'a B,
}

impl<A, B> NodePairs<'_, A, B>
where
    A: NodeLookup + ?Sized,
    B: NodeLookup + ?Sized,
{
    fn equal(&self, a_id: NodeId, b_id: NodeId, assumed: &mut AHashSet<(NodeId, NodeId)>) -> bool {
        if !assumed.insert((a_id, b_id)) {
            return true;
        }
        let (a, b) = match (self.a.lookup(a_id), self.b.lookup(b_id)) {
            (Some(a), Some(b)) => (a, b),
            (None, None) => return !a_id.is_valid() && !b_id.is_valid(),
            _ => return false,
        };
        if a.nullable != b.nullable {
            return false;
        }
        match (&a.kind, &b.kind) {
            (
                NodeKind::Primitive { dtype, data },
                NodeKind::Primitive {
                    dtype: other_dtype,
                    data: other_data,
                },
            ) => dtype == other_dtype && data == other_data,
            (
                NodeKind::ListCount { counts, contents },
                NodeKind::ListCount {
                    counts: other_counts,
                    contents: other_contents,
                },
            ) => counts == other_counts && self.equal(*contents, *other_contents, assumed),
            (
                NodeKind::ListOffset { offsets, contents },
                NodeKind::ListOffset {
                    offsets: other_offsets,
                    contents: other_contents,
                },
            ) => offsets == other_offsets && self.equal(*contents, *other_contents, assumed),
            (
                NodeKind::ListBeginEnd {
                    begin,
                    end,
                    contents,
                },
                NodeKind::ListBeginEnd {
                    begin: other_begin,
                    end: other_end,
                    contents: other_contents,
                },
            ) => {
                begin == other_begin
                    && end == other_end
                    && self.equal(*contents, *other_contents, assumed)
            }
            (
                NodeKind::Record {
                    name,
                    runtime,
                    fields,
                },
                NodeKind::Record {
                    name: other_name,
                    runtime: other_runtime,
                    fields: other_fields,
                },
            ) => {
                name == other_name
                    && runtime == other_runtime
                    && fields.len() == other_fields.len()
                    && fields.iter().zip(other_fields).all(|((n, id), (m, other))| {
                        n == m && self.equal(*id, *other, assumed)
                    })
            }
            (
                NodeKind::Tuple { runtime, items },
                NodeKind::Tuple {
                    runtime: other_runtime,
                    items: other_items,
                },
            ) => runtime == other_runtime && self.all_equal(items, other_items, assumed),
            (
                NodeKind::UnionDense {
                    tags,
                    possibilities,
                },
                NodeKind::UnionDense {
                    tags: other_tags,
                    possibilities: other_possibilities,
                },
            ) => tags == other_tags && self.all_equal(possibilities, other_possibilities, assumed),
            (
                NodeKind::UnionDenseOffset {
                    tags,
                    offsets,
                    possibilities,
                },
                NodeKind::UnionDenseOffset {
                    tags: other_tags,
                    offsets: other_offsets,
                    possibilities: other_possibilities,
                },
            ) => {
                tags == other_tags
                    && offsets == other_offsets
                    && self.all_equal(possibilities, other_possibilities, assumed)
            }
            (
                NodeKind::Pointer { index, target },
                NodeKind::Pointer {
                    index: other_index,
                    target: other_target,
                },
            ) => index == other_index && self.equal(*target, *other_target, assumed),
            _ => false,
        }
    }

    fn all_equal(
        &self,
        a: &[NodeId],
        b: &[NodeId],
        assumed: &mut AHashSet<(NodeId, NodeId)>,
    ) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.equal(*x, *y, assumed))
    }
}
