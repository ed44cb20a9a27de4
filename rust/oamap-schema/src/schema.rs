//! The schema arena and its traversal operations.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use oamap_common::{Result, error::Error};

use crate::{
    equality::structurally_equal,
    node::{Node, NodeId, NodeKind},
    path::{PathNaming, PathSegment, SchemaPath},
};

/// Traversal order of [`Schema::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrder {
    /// Pre-order: a node before its children.
    RootFirst,
    /// Post-order: a node after its children.
    RootLast,
}

/// A finished schema: an arena of nodes with a distinguished root.
///
/// Node ids are stable for the lifetime of the schema. Nodes that are not reachable
/// from the root (e.g. union possibilities removed as duplicates) may remain in the
/// arena; traversals never visit them.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<Node>,
    root: NodeId,
    origin: Option<Arc<Schema>>,
}

impl Schema {
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId, origin: Option<Arc<Schema>>) -> Schema {
        Schema {
            nodes,
            root,
            origin,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this schema.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.as_usize()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize())
    }

    pub fn root_node(&self) -> &Node {
        self.node(self.root)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The original abstract schema this one was derived from, if any.
    pub fn origin(&self) -> Option<&Arc<Schema>> {
        self.origin.as_ref()
    }

    /// The id of the node in the original abstract schema that `id` was derived from.
    ///
    /// For a schema that is not derived, this is `id` itself.
    pub fn origin_id(&self, id: NodeId) -> NodeId {
        match &self.origin {
            Some(_) => self.node(id).base.unwrap_or(id),
            None => id,
        }
    }

    /// The origin schema of derivations from this one: its own origin, or itself.
    pub fn origin_or_self(&self) -> Arc<Schema> {
        match &self.origin {
            Some(origin) => origin.clone(),
            None => Arc::new(self.clone()),
        }
    }

    /// Outgoing edges of a node, including a pointer's target.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).kind.children()
    }

    /// Visits every node reachable from the root exactly once.
    pub fn walk(&self, order: WalkOrder) -> Vec<NodeId> {
        self.walk_from(self.root, order)
    }

    /// Visits every node reachable from `start` exactly once, following pointer
    /// targets.
    pub fn walk_from(&self, start: NodeId, order: WalkOrder) -> Vec<NodeId> {
        fn visit(
            schema: &Schema,
            id: NodeId,
            order: WalkOrder,
            seen: &mut AHashSet<NodeId>,
            out: &mut Vec<NodeId>,
        ) {
            if !seen.insert(id) {
                return;
            }
            if order == WalkOrder::RootFirst {
                out.push(id);
            }
            for child in schema.children(id) {
                visit(schema, child, order, seen, out);
            }
            if order == WalkOrder::RootLast {
                out.push(id);
            }
        }

        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        visit(self, start, order, &mut seen, &mut out);
        out
    }

    /// The de-duplicated list of nodes reachable from the root, root first.
    pub fn members(&self) -> Vec<NodeId> {
        self.walk(WalkOrder::RootFirst)
    }

    /// Returns `true` if any node of `set` is reachable from `id` (inclusive),
    /// following pointer targets.
    pub fn contains_any(&self, id: NodeId, set: &AHashSet<NodeId>) -> bool {
        if set.is_empty() {
            return false;
        }
        self.walk_from(id, WalkOrder::RootFirst)
            .iter()
            .any(|id| set.contains(id))
    }

    /// Finds the first node reachable from the root whose origin is `base`.
    pub fn find_by_base(&self, base: NodeId) -> Option<NodeId> {
        self.members()
            .into_iter()
            .find(|&id| self.origin_id(id) == base)
    }

    /// Returns `true` if every reachable node is in a form the proxy algorithm reads
    /// and every buffer is bound.
    pub fn is_bound(&self) -> bool {
        self.members().into_iter().all(|id| {
            let kind = &self.node(id).kind;
            kind.is_canonical_bound_form() && kind.buffers().iter().all(|(_, b)| b.is_bound())
        })
    }

    /// Structural equality of two subtrees, possibly of different schemas.
    pub fn subtree_eq(&self, id: NodeId, other: &Schema, other_id: NodeId) -> bool {
        structurally_equal(&self.nodes[..], id, &other.nodes[..], other_id)
    }

    /// Assigns a containment path to every reachable node, root first.
    ///
    /// Children are named by their owning edge. A pointer target that is not owned
    /// anywhere in the containment tree is placed under the first pointer referring
    /// to it, at `pointer path + Pt` (the topmost unowned ancestor of the target is
    /// placed there when the target itself is owned by an unreachable node).
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateContainer` if a node is owned by more than one container,
    /// and with `InvalidArgument` if a record field name contains the delimiter of
    /// `naming`, since its key could not be parsed back.
    pub fn paths(&self, naming: &PathNaming) -> Result<Vec<(NodeId, SchemaPath)>> {
        let mut walk = PathWalk {
            schema: self,
            assigned: AHashMap::new(),
            order: Vec::new(),
            pending: Vec::new(),
        };
        walk.contain(self.root, naming.root())?;

        let owners = self.owners();
        let mut next = 0;
        while next < walk.pending.len() {
            let (mut target, pointer_path) = walk.pending[next].clone();
            next += 1;
            while let Some(&owner) = owners.get(&target) {
                if walk.assigned.contains_key(&owner) || walk.assigned.contains_key(&target) {
                    break;
                }
                target = owner;
            }
            if !walk.assigned.contains_key(&target) {
                walk.contain(target, pointer_path.child(PathSegment::PointerTarget))?;
            }
        }
        Ok(walk.order)
    }

    /// Follows the node edges named by `path` from the root.
    ///
    /// Returns `None` if the path does not lead to a node, including paths ending in a
    /// buffer segment.
    pub fn node_at(&self, path: &SchemaPath) -> Option<NodeId> {
        let mut id = self.root;
        for segment in path.segments() {
            let kind = &self.get(id)?.kind;
            id = match (segment, kind) {
                (PathSegment::PointerTarget, NodeKind::Pointer { target, .. }) => *target,
                _ => kind
                    .owned_children()
                    .into_iter()
                    .find(|(s, _)| s == segment)
                    .map(|(_, child)| child)?,
            };
        }
        Some(id)
    }

    /// Maps each reachable node to the container owning it.
    fn owners(&self) -> AHashMap<NodeId, NodeId> {
        let mut owners = AHashMap::new();
        for id in self.members() {
            for (_, child) in self.node(id).kind.owned_children() {
                owners.entry(child).or_insert(id);
            }
        }
        owners
    }
}

struct PathWalk<'a> {
    schema: &'a Schema,
    assigned: AHashMap<NodeId, SchemaPath>,
    order: Vec<(NodeId, SchemaPath)>,
    pending: Vec<(NodeId, SchemaPath)>,
}

impl PathWalk<'_> {
    fn contain(&mut self, id: NodeId, path: SchemaPath) -> Result<()> {
        if let Some(previous) = self.assigned.get(&id) {
            return Err(Error::duplicate_container(format!(
                "node {id} at both {previous} and {path}"
            )));
        }
        self.assigned.insert(id, path.clone());
        self.order.push((id, path.clone()));
        let kind = &self.schema.node(id).kind;
        for (segment, child) in kind.owned_children() {
            if let PathSegment::RecordField(name) = &segment {
                if name.contains(path.delimiter()) {
                    return Err(Error::invalid_arg(
                        "field",
                        format!(
                            "'{name}' under {path} contains the key delimiter '{}'",
                            path.delimiter()
                        ),
                    ));
                }
            }
            self.contain(child, path.child(segment))?;
        }
        if let NodeKind::Pointer { target, .. } = kind {
            self.pending.push((*target, path));
        }
        Ok(())
    }
}

impl PartialEq for Schema {
    /// Structural equality of the trees rooted at each schema's root.
    fn eq(&self, other: &Schema) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format(2, 80))
    }
}
