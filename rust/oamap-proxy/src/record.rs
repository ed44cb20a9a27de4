//! Record and tuple proxies.

use std::{fmt, sync::Arc};

use oamap_common::{Result, error::Error};
use oamap_schema::{NodeId, NodeKind, RuntimeTag, Schema};

use crate::{access::access, value::Value};

/// A record at one index of a `Record` node. Fields are read on demand, each at the
/// same index of its own field node.
#[derive(Clone)]
pub struct RecordProxy {
    schema: Arc<Schema>,
    node: NodeId,
    index: usize,
}

impl RecordProxy {
    pub(crate) fn new(schema: Arc<Schema>, node: NodeId, index: usize) -> RecordProxy {
        RecordProxy {
            schema,
            node,
            index,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The record type name (`Record-<k>` unless named explicitly).
    pub fn name(&self) -> &str {
        match &self.schema.node(self.node).kind {
            NodeKind::Record { name, .. } => name,
            _ => "",
        }
    }

    pub fn runtime(&self) -> Option<&RuntimeTag> {
        match &self.schema.node(self.node).kind {
            NodeKind::Record { runtime, .. } => runtime.as_ref(),
            _ => None,
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.field_nodes().iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.field_nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_nodes().is_empty()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_nodes().iter().any(|(field, _)| field == name)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        let (_, node) = self
            .field_nodes()
            .iter()
            .find(|(field, _)| field == name)
            .ok_or_else(|| Error::missing_field(name, self.name()))?;
        access(&self.schema, *node, self.index)
    }

    /// All fields with their values, in declaration order.
    pub fn fields(&self) -> Result<Vec<(String, Value)>> {
        self.field_nodes()
            .iter()
            .map(|(name, node)| Ok((name.clone(), access(&self.schema, *node, self.index)?)))
            .collect()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (name, value) in self.fields()? {
            map.insert(name, value.to_json()?);
        }
        Ok(serde_json::Value::Object(map))
    }

    fn field_nodes(&self) -> &[(String, NodeId)] {
        match &self.schema.node(self.node).kind {
            NodeKind::Record { fields, .. } => fields,
            _ => &[],
        }
    }
}

impl fmt::Debug for RecordProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordProxy")
            .field("name", &self.name())
            .field("node", &self.node)
            .field("index", &self.index)
            .finish()
    }
}

/// A tuple at one index of a `Tuple` node.
#[derive(Clone)]
pub struct TupleProxy {
    schema: Arc<Schema>,
    node: NodeId,
    index: usize,
}

impl TupleProxy {
    pub(crate) fn new(schema: Arc<Schema>, node: NodeId, index: usize) -> TupleProxy {
        TupleProxy {
            schema,
            node,
            index,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn runtime(&self) -> Option<&RuntimeTag> {
        match &self.schema.node(self.node).kind {
            NodeKind::Tuple { runtime, .. } => runtime.as_ref(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.item_nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_nodes().is_empty()
    }

    pub fn get(&self, position: usize) -> Result<Value> {
        let node = self
            .item_nodes()
            .get(position)
            .ok_or_else(|| Error::index_out_of_range(position as i64, self.len()))?;
        access(&self.schema, *node, self.index)
    }

    pub fn items(&self) -> Result<Vec<Value>> {
        self.item_nodes()
            .iter()
            .map(|node| access(&self.schema, *node, self.index))
            .collect()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.items()?
            .iter()
            .map(Value::to_json)
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    }

    fn item_nodes(&self) -> &[NodeId] {
        match &self.schema.node(self.node).kind {
            NodeKind::Tuple { items, .. } => items,
            _ => &[],
        }
    }
}

impl fmt::Debug for TupleProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleProxy")
            .field("node", &self.node)
            .field("index", &self.index)
            .field("len", &self.len())
            .finish()
    }
}
