use ahash::AHashMap;
use oamap_buffers::{BufferDescriptor, BufferMap, ElementType, Scalar, fillable::FillableArray};
use oamap_common::{Result, error::Error};
use oamap_schema::{BufferRef, HostValue, NodeId, NodeKind, PathSegment, Schema, SchemaPath};

use crate::config::IngestConfig;

/// Fills the buffers of an abstract `schema` with `rows`, one root value per row.
///
/// Buffers must be named by their path (`Default`) or by an explicit `Key`. Every
/// named buffer is emitted, including those of nodes no row reached. A union also
/// emits the per-possibility offset stream (`Uo`) next to its tags.
///
/// # Errors
///
/// - `MissingField` if a record field is absent from a host value;
/// - `LengthMismatch` if a tuple has the wrong number of items;
/// - `NoCompatiblePossibility` if no union possibility admits a value;
/// - `NotImplemented` if the schema contains a pointer;
/// - `InvalidArgument` if a value does not fit its node at all.
pub fn fill(schema: &Schema, rows: &[HostValue], config: &IngestConfig) -> Result<BufferMap> {
    config.validate()?;
    let mut filler = Filler::new(schema, config)?;
    for row in rows {
        filler.fill_value(schema.root(), row)?;
    }
    let buffers = filler.finish()?;
    log::debug!("filled {} rows into {} buffers", rows.len(), buffers.len());
    Ok(buffers)
}

struct Stream {
    key: String,
    array: FillableArray,
}

/// Fill state of one node.
enum NodeFill {
    Data(Stream),
    Counts(Stream),
    /// `running` is the offset the next list begins at.
    Offsets {
        offsets: Stream,
        running: u64,
    },
    BeginEnd {
        begin: Stream,
        end: Stream,
        running: u64,
    },
    /// `counts[k]` is the number of entries routed to possibility `k` so far.
    Union {
        tags: Stream,
        offsets: Stream,
        counts: Vec<u64>,
    },
}

struct Filler<'a> {
    schema: &'a Schema,
    paths: AHashMap<NodeId, SchemaPath>,
    states: AHashMap<NodeId, NodeFill>,
}

impl<'a> Filler<'a> {
    fn new(schema: &'a Schema, config: &IngestConfig) -> Result<Filler<'a>> {
        let paths = schema
            .paths(&config.naming)?
            .into_iter()
            .collect::<AHashMap<_, _>>();
        let mut states = AHashMap::with_capacity(paths.len());
        for (&id, path) in &paths {
            let node = schema.node(id);
            let nullable = node.nullable;
            let stream = |buffer: &BufferRef, segment: Option<PathSegment>, dtype, nullable| {
                let key = match buffer.descriptor() {
                    Some(BufferDescriptor::Default) => path.buffer_key(segment.as_ref()),
                    Some(BufferDescriptor::Key(key)) => key.clone(),
                    _ => {
                        return Err(Error::invalid_arg(
                            path.format(),
                            "filled buffers must be named by path or key",
                        ));
                    }
                };
                Ok(Stream {
                    key,
                    array: FillableArray::new(dtype, nullable, config.chunk_bytes),
                })
            };
            let state = match &node.kind {
                NodeKind::Primitive { dtype, data } => {
                    NodeFill::Data(stream(data, None, *dtype, nullable)?)
                }
                NodeKind::ListCount { counts, .. } => NodeFill::Counts(stream(
                    counts,
                    Some(PathSegment::ListCount),
                    ElementType::UInt64,
                    nullable,
                )?),
                NodeKind::ListOffset { offsets, .. } => NodeFill::Offsets {
                    offsets: stream(
                        offsets,
                        Some(PathSegment::ListOffset),
                        ElementType::UInt64,
                        nullable,
                    )?,
                    running: 0,
                },
                NodeKind::ListBeginEnd { begin, end, .. } => NodeFill::BeginEnd {
                    begin: stream(
                        begin,
                        Some(PathSegment::ListBegin),
                        ElementType::UInt64,
                        nullable,
                    )?,
                    end: stream(end, Some(PathSegment::ListEnd), ElementType::UInt64, false)?,
                    running: 0,
                },
                NodeKind::UnionDense {
                    tags,
                    possibilities,
                } => NodeFill::Union {
                    tags: stream(
                        tags,
                        Some(PathSegment::UnionTag),
                        tag_type(possibilities.len()),
                        nullable,
                    )?,
                    offsets: stream(
                        &BufferRef::default(),
                        Some(PathSegment::UnionOffset),
                        ElementType::UInt64,
                        false,
                    )?,
                    counts: vec![0; possibilities.len()],
                },
                NodeKind::UnionDenseOffset {
                    tags,
                    offsets,
                    possibilities,
                } => NodeFill::Union {
                    tags: stream(
                        tags,
                        Some(PathSegment::UnionTag),
                        tag_type(possibilities.len()),
                        nullable,
                    )?,
                    offsets: stream(
                        offsets,
                        Some(PathSegment::UnionOffset),
                        ElementType::UInt64,
                        false,
                    )?,
                    counts: vec![0; possibilities.len()],
                },
                NodeKind::Record { .. } | NodeKind::Tuple { .. } => continue,
                NodeKind::Pointer { .. } => {
                    return Err(Error::not_implemented(format!(
                        "filling pointer node {}",
                        path.format()
                    )));
                }
            };
            states.insert(id, state);
        }
        Ok(Filler {
            schema,
            paths,
            states,
        })
    }

    fn fill_value(&mut self, id: NodeId, value: &HostValue) -> Result<()> {
        let schema = self.schema;
        let node = schema.node(id);
        if node.nullable && value.is_null() {
            return self.fill_null(id, value);
        }
        match &node.kind {
            NodeKind::Primitive { dtype, .. } => {
                let scalar = host_scalar(value, *dtype).ok_or_else(|| self.mismatch(id, value))?;
                match self.states.get_mut(&id) {
                    Some(NodeFill::Data(data)) => data.array.push_scalar(&scalar)?,
                    _ => return Err(self.mismatch(id, value)),
                }
            }
            NodeKind::ListCount { contents, .. }
            | NodeKind::ListOffset { contents, .. }
            | NodeKind::ListBeginEnd { contents, .. } => {
                let HostValue::List(items) = value else {
                    return Err(self.mismatch(id, value));
                };
                let len = items.len() as u64;
                match self.states.get_mut(&id) {
                    Some(NodeFill::Counts(counts)) => {
                        counts.array.push_scalar(&Scalar::UInt(len))?;
                    }
                    Some(NodeFill::Offsets { offsets, running }) => {
                        offsets.array.push_scalar(&Scalar::UInt(*running))?;
                        *running += len;
                    }
                    Some(NodeFill::BeginEnd {
                        begin,
                        end,
                        running,
                    }) => {
                        begin.array.push_scalar(&Scalar::UInt(*running))?;
                        *running += len;
                        end.array.push_scalar(&Scalar::UInt(*running))?;
                    }
                    _ => return Err(self.mismatch(id, value)),
                }
                for item in items {
                    self.fill_value(*contents, item)?;
                }
            }
            NodeKind::Record { fields, .. } => {
                if !value.has_fields() {
                    return Err(self.mismatch(id, value));
                }
                for (field, child) in fields {
                    let found = value
                        .with_fields(|host| {
                            match host.iter().find(|(name, _)| *name == field.as_str()) {
                                Some((_, v)) => self.fill_value(*child, v).map(|_| true),
                                None => Ok(false),
                            }
                        })
                        .unwrap_or(Ok(false))?;
                    if !found {
                        return Err(Error::missing_field(field, self.path(id)));
                    }
                }
            }
            NodeKind::Tuple { items, .. } => {
                let values = value
                    .tuple_items()
                    .ok_or_else(|| self.mismatch(id, value))?;
                if values.len() != items.len() {
                    return Err(Error::length_mismatch(
                        items.len(),
                        values.len(),
                        self.path(id),
                    ));
                }
                for (child, v) in items.iter().zip(values) {
                    self.fill_value(*child, v)?;
                }
            }
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => {
                // A possibility that stores every field of the value wins over an
                // earlier one that would drop some.
                let k = possibilities
                    .iter()
                    .position(|&p| schema.is_exact_instance(p, value))
                    .or_else(|| {
                        possibilities
                            .iter()
                            .position(|&p| schema.is_instance(p, value))
                    })
                    .ok_or_else(|| Error::no_compatible_possibility(self.path(id)))?;
                match self.states.get_mut(&id) {
                    Some(NodeFill::Union {
                        tags,
                        offsets,
                        counts,
                    }) => {
                        tags.array.push_scalar(&Scalar::UInt(k as u64))?;
                        offsets.array.push_scalar(&Scalar::UInt(counts[k]))?;
                        counts[k] += 1;
                    }
                    _ => return Err(self.mismatch(id, value)),
                }
                self.fill_value(possibilities[k], value)?;
            }
            NodeKind::Pointer { .. } => {
                return Err(Error::not_implemented(format!(
                    "filling pointer node {}",
                    self.path(id)
                )));
            }
        }
        Ok(())
    }

    /// Appends a null entry to a nullable node. A null list still records its
    /// boundary, since the neighboring lists begin and end there.
    fn fill_null(&mut self, id: NodeId, value: &HostValue) -> Result<()> {
        match self.states.get_mut(&id) {
            Some(NodeFill::Data(data)) => data.array.push_null(),
            Some(NodeFill::Counts(counts)) => counts.array.push_masked(&Scalar::UInt(0)),
            Some(NodeFill::Offsets { offsets, running }) => {
                offsets.array.push_masked(&Scalar::UInt(*running))
            }
            Some(NodeFill::BeginEnd {
                begin,
                end,
                running,
            }) => {
                begin.array.push_masked(&Scalar::UInt(*running))?;
                end.array.push_scalar(&Scalar::UInt(*running))
            }
            Some(NodeFill::Union { tags, offsets, .. }) => {
                tags.array.push_null()?;
                offsets.array.push_scalar(&Scalar::UInt(0))
            }
            None => Err(self.mismatch(id, value)),
        }
    }

    fn finish(self) -> Result<BufferMap> {
        let mut buffers = BufferMap::new();
        let mut emit = |stream: Stream| -> Result<()> {
            let array = stream.array.finalize()?;
            if buffers.insert(stream.key.clone(), array).is_some() {
                return Err(Error::invalid_arg(
                    stream.key,
                    "buffer key is used by more than one node",
                ));
            }
            Ok(())
        };
        for (_, state) in self.states {
            match state {
                NodeFill::Data(stream) | NodeFill::Counts(stream) => emit(stream)?,
                NodeFill::Offsets {
                    mut offsets,
                    running,
                } => {
                    offsets.array.push_scalar(&Scalar::UInt(running))?;
                    emit(offsets)?;
                }
                NodeFill::BeginEnd { begin, end, .. } => {
                    emit(begin)?;
                    emit(end)?;
                }
                NodeFill::Union { tags, offsets, .. } => {
                    emit(tags)?;
                    emit(offsets)?;
                }
            }
        }
        Ok(buffers)
    }

    fn path(&self, id: NodeId) -> String {
        self.paths
            .get(&id)
            .map_or_else(|| format!("node {id}"), SchemaPath::format)
    }

    fn mismatch(&self, id: NodeId, value: &HostValue) -> Error {
        Error::invalid_arg(
            self.path(id),
            format!(
                "{} node does not admit {}",
                self.schema.node(id).kind.name(),
                describe(value)
            ),
        )
    }
}

/// Tag width for a union of `possibilities`.
fn tag_type(possibilities: usize) -> ElementType {
    ElementType::smallest_unsigned(possibilities.saturating_sub(1) as i128)
        .unwrap_or(ElementType::UInt64)
}

/// Converts a host leaf to a scalar storable as `dtype`. Integers going into
/// floating-point or complex buffers are converted up front.
fn host_scalar(value: &HostValue, dtype: ElementType) -> Option<Scalar> {
    match *value {
        HostValue::Bool(v) => Some(Scalar::Bool(v)),
        HostValue::Int(v) if dtype.is_floating() || dtype.is_complex() => {
            Some(Scalar::Float(v as f64))
        }
        HostValue::Int(v) => match i64::try_from(v) {
            Ok(v) => Some(Scalar::Int(v)),
            Err(_) => u64::try_from(v).ok().map(Scalar::UInt),
        },
        HostValue::Float(v) => Some(Scalar::Float(v)),
        HostValue::Complex(v) => Some(Scalar::Complex(v)),
        _ => None,
    }
}

fn describe(value: &HostValue) -> &'static str {
    match value {
        HostValue::Null => "null",
        HostValue::Bool(_) => "a boolean",
        HostValue::Int(_) => "an integer",
        HostValue::Float(_) => "a float",
        HostValue::Complex(_) => "a complex number",
        HostValue::List(_) => "a list",
        HostValue::Mapping(_) => "a mapping",
        HostValue::Tuple(_) => "a tuple",
        HostValue::NamedTuple { .. } => "a named tuple",
        HostValue::Object(_) => "an object",
    }
}
