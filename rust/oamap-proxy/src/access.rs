use std::sync::Arc;

use oamap_buffers::Array;
use oamap_common::{Result, error::Error, verify_data};
use oamap_resolve::logical_len;
use oamap_schema::{NodeId, NodeKind, Schema};

use crate::{
    list::ListProxy,
    record::{RecordProxy, TupleProxy},
    value::Value,
};

/// Reads the logical value of node `id` at `index`.
pub(crate) fn access(schema: &Arc<Schema>, id: NodeId, index: usize) -> Result<Value> {
    let len = logical_len(schema, id)?;
    if index >= len {
        return Err(Error::index_out_of_range(index as i64, len));
    }
    let node = schema.node(id);
    match &node.kind {
        NodeKind::Primitive { data, .. } => {
            let data = data.array()?;
            if node.nullable && data.is_null(index) {
                return Ok(Value::Null);
            }
            data.get(index)
                .map(Value::from)
                .ok_or_else(|| Error::index_out_of_range(index as i64, data.len()))
        }
        NodeKind::ListBeginEnd {
            begin,
            end,
            contents,
        } => {
            let begin = begin.array()?;
            if node.nullable && begin.is_null(index) {
                return Ok(Value::Null);
            }
            let start = position(begin, index, id, "begin")?;
            let stop = position(end.array()?, index, id, "end")?;
            verify_data!(stop, start <= stop);
            Ok(Value::List(ListProxy::new(
                schema.clone(),
                *contents,
                start,
                stop - start,
            )))
        }
        NodeKind::Record { .. } => Ok(Value::Record(RecordProxy::new(schema.clone(), id, index))),
        NodeKind::Tuple { .. } => Ok(Value::Tuple(TupleProxy::new(schema.clone(), id, index))),
        NodeKind::UnionDenseOffset {
            tags,
            offsets,
            possibilities,
        } => {
            let tags = tags.array()?;
            if node.nullable && tags.is_null(index) {
                return Ok(Value::Null);
            }
            let tag = position(tags, index, id, "tag")?;
            let possibility = possibilities.get(tag).ok_or_else(|| {
                Error::shape_mismatch(
                    format!("node {id} tag"),
                    format!("tag {tag} of {} possibilities", possibilities.len()),
                )
            })?;
            let offset = position(offsets.array()?, index, id, "offset")?;
            access(schema, *possibility, offset)
        }
        NodeKind::Pointer {
            index: pointer,
            target,
        } => {
            let pointer = pointer.array()?;
            if node.nullable && pointer.is_null(index) {
                return Ok(Value::Null);
            }
            let at = position(pointer, index, id, "index")?;
            access(schema, *target, at)
        }
        other => Err(Error::invalid_operation(format!(
            "{} node {id} is not in bound form",
            other.name()
        ))),
    }
}

fn position(array: &Array, index: usize, id: NodeId, buffer: &str) -> Result<usize> {
    array
        .get(index)
        .and_then(|scalar| scalar.as_index())
        .and_then(|value| usize::try_from(value).ok())
        .ok_or_else(|| {
            Error::shape_mismatch(
                format!("node {id} {buffer}"),
                format!("no position at entry {index}"),
            )
        })
}
