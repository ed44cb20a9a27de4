use ahash::AHashMap;
use oamap_common::{Result, error::Error};
use oamap_schema::{BufferRef, NodeId, NodeKind, Schema, SchemaBuilder};

/// Materializes every buffer of a bound schema and returns it as an abstract schema
/// whose descriptors are literal arrays.
///
/// The result keeps the canonical bound forms and the origin links, so resolving it
/// again reproduces the same buffers.
pub fn as_abstract(schema: &Schema) -> Result<Schema> {
    let members = schema.members();
    let mut builder = SchemaBuilder::new();
    let ids = members
        .iter()
        .map(|&id| (id, builder.reserve()))
        .collect::<AHashMap<_, _>>();
    for &id in &members {
        let mut node = schema.node(id).clone();
        for buffer in node.kind.buffers_mut() {
            if let BufferRef::Bound(bound) = &*buffer {
                let array = bound.array()?.clone();
                *buffer = BufferRef::from(array);
            }
        }
        node.kind.map_children(|child| ids[&child]);
        node.base = Some(schema.origin_id(id));
        builder.define(ids[&id], node)?;
    }
    builder.finish_derived(ids[&schema.root()], schema.origin_or_self())
}

/// The number of logical values of a node.
///
/// Reads the node's primary buffer (materializing it if deferred); records and tuples
/// report the length of their first child, or zero when they have none. Works on any
/// schema whose buffers are bound or literal arrays.
pub fn logical_len(schema: &Schema, id: NodeId) -> Result<usize> {
    let node = schema
        .get(id)
        .ok_or_else(|| Error::invalid_arg("id", format!("node {id} does not exist")))?;
    let len = match &node.kind {
        NodeKind::Primitive { data, .. } => data.array()?.len(),
        NodeKind::ListCount { counts, .. } => counts.array()?.len(),
        NodeKind::ListOffset { offsets, .. } => offsets.array()?.len().saturating_sub(1),
        NodeKind::ListBeginEnd { begin, .. } => begin.array()?.len(),
        NodeKind::Record { fields, .. } => match fields.first() {
            Some((_, child)) => logical_len(schema, *child)?,
            None => 0,
        },
        NodeKind::Tuple { items, .. } => match items.first() {
            Some(child) => logical_len(schema, *child)?,
            None => 0,
        },
        NodeKind::UnionDense { tags, .. } | NodeKind::UnionDenseOffset { tags, .. } => {
            tags.array()?.len()
        }
        NodeKind::Pointer { index, .. } => index.array()?.len(),
    };
    Ok(len)
}
