use ahash::AHashSet;

use crate::{
    host::HostValue,
    node::{NodeId, NodeKind},
    schema::Schema,
};

impl Schema {
    /// Returns `true` if `value` can be stored under the node `id`.
    ///
    /// Numeric checks use the node's declared element type: an integer must fall into
    /// the type's range (floating and complex types admit any integer), a float needs a
    /// floating or complex type, and a complex value needs a complex type. A null is
    /// admitted by nullable nodes and by unions with a nullable possibility; records
    /// and tuples never admit a null.
    pub fn is_instance(&self, id: NodeId, value: &HostValue) -> bool {
        InstanceCheck::new(self, false).instance_of(id, value)
    }

    /// Like [`Schema::is_instance`], but a record also rejects a value carrying a
    /// field it does not declare, at any depth. A value admitted this way is stored
    /// without loss.
    pub fn is_exact_instance(&self, id: NodeId, value: &HostValue) -> bool {
        InstanceCheck::new(self, true).instance_of(id, value)
    }
}

struct InstanceCheck<'a> {
    schema: &'a Schema,
    exact: bool,
    in_flight: AHashSet<(NodeId, usize)>,
}

impl<'a> InstanceCheck<'a> {
    fn new(schema: &'a Schema, exact: bool) -> Self {
        InstanceCheck {
            schema,
            exact,
            in_flight: AHashSet::new(),
        }
    }

    fn instance_of(&mut self, id: NodeId, value: &HostValue) -> bool {
        let schema = self.schema;
        let node = schema.node(id);
        if value.is_null() {
            return match &node.kind {
                NodeKind::UnionDense { possibilities, .. }
                | NodeKind::UnionDenseOffset { possibilities, .. } => {
                    node.nullable
                        || possibilities
                            .iter()
                            .any(|p| self.instance_of(*p, value))
                }
                kind => !kind.is_structural() && node.nullable,
            };
        }
        // A self-referencing object is admitted if it is admitted everywhere else.
        if let HostValue::Object(object) = value {
            if !self.in_flight.insert((id, object.id())) {
                return true;
            }
            let admitted = self.kind_admits(id, value);
            self.in_flight.remove(&(id, object.id()));
            return admitted;
        }
        self.kind_admits(id, value)
    }

    fn kind_admits(&mut self, id: NodeId, value: &HostValue) -> bool {
        let schema = self.schema;
        match &schema.node(id).kind {
            NodeKind::Primitive { dtype, .. } => match value {
                HostValue::Bool(_) => *dtype == oamap_buffers::ElementType::Boolean,
                HostValue::Int(v) => dtype.admits_int(*v),
                HostValue::Float(_) => dtype.is_floating() || dtype.is_complex(),
                HostValue::Complex(_) => dtype.is_complex(),
                _ => false,
            },
            NodeKind::ListCount { contents, .. }
            | NodeKind::ListOffset { contents, .. }
            | NodeKind::ListBeginEnd { contents, .. } => match value {
                HostValue::List(items) => items
                    .iter()
                    .all(|item| self.instance_of(*contents, item)),
                _ => false,
            },
            NodeKind::Record { fields, .. } => value
                .with_fields(|host| {
                    let undeclared = self.exact
                        && host
                            .iter()
                            .any(|(k, _)| !fields.iter().any(|(name, _)| name == k));
                    !undeclared
                        && fields.iter().all(|(name, child)| {
                            host.iter()
                                .find(|(k, _)| k == name)
                                .is_some_and(|(_, v)| self.instance_of(*child, v))
                        })
                })
                .unwrap_or(false),
            NodeKind::Tuple { items, .. } => value.tuple_items().is_some_and(|values| {
                values.len() == items.len()
                    && items
                        .iter()
                        .zip(values)
                        .all(|(child, v)| self.instance_of(*child, v))
            }),
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => possibilities
                .iter()
                .any(|p| self.instance_of(*p, value)),
            NodeKind::Pointer { target, .. } => self.instance_of(*target, value),
        }
    }
}
