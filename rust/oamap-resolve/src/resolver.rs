use std::sync::Arc;

use ahash::AHashMap;
use oamap_buffers::{
    Array, BoundBuffer, BufferDescriptor, BufferExpectation, DTypeRule, ElementType, LazyBuffers,
    Source, load_buffer,
};
use oamap_common::{Result, error::Error};
use oamap_schema::{
    BufferRef, Node, NodeKind, PathSegment as S, Schema, SchemaBuilder, SchemaPath,
};

use crate::{derive, options::ResolveOptions, validate};

/// Binds abstract schemas to the buffers of one source.
pub struct Resolver {
    source: Arc<dyn Source>,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(source: Arc<dyn Source>, options: ResolveOptions) -> Resolver {
        Resolver { source, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    /// Produces the bound form of `schema`.
    ///
    /// Every reachable node is named by its containment path under the configured
    /// naming; `Default` descriptors are looked up in the source under that path.
    /// Shared pointer targets are bound once, so cyclic pointer graphs map onto
    /// cyclic bound graphs.
    ///
    /// # Errors
    ///
    /// - `DuplicateContainer` if a node is owned by more than one container;
    /// - `MissingBuffer` and `ShapeMismatch` from the buffer adapter (eager mode; in
    ///   lazy mode these surface on first access instead);
    /// - `ShapeMismatch` from the invariant checks of an eager, validated pass.
    pub fn resolve(&self, schema: &Schema) -> Result<Arc<Schema>> {
        self.options.validate()?;
        let paths = schema
            .paths(&self.options.naming)?
            .into_iter()
            .collect::<AHashMap<_, _>>();
        log::debug!(
            "resolving {} nodes (lazy: {})",
            paths.len(),
            self.options.lazy
        );

        let members = schema.members();
        let mut builder = SchemaBuilder::new();
        let bound_ids = members
            .iter()
            .map(|&id| (id, builder.reserve()))
            .collect::<AHashMap<_, _>>();
        for &id in &members {
            let path = paths
                .get(&id)
                .ok_or_else(|| Error::invalid_operation(format!("node {id} has no path")))?;
            let mut node = self.bind_node(schema.node(id), path)?;
            node.kind.map_children(|child| bound_ids[&child]);
            node.base = Some(schema.origin_id(id));
            builder.define(bound_ids[&id], node)?;
        }
        let bound = builder.finish_derived(bound_ids[&schema.root()], schema.origin_or_self())?;

        if self.options.validate && !self.options.lazy {
            validate::validate_bound(&bound, &self.options.naming)?;
        }
        log::debug!("resolved {} nodes", bound.len());
        Ok(Arc::new(bound))
    }

    fn bind_node(&self, node: &Node, path: &SchemaPath) -> Result<Node> {
        let nullable = node.nullable;
        let input = |buffer: &BufferRef, segment, rule, nullable| -> Result<BufferInput> {
            Ok(BufferInput {
                descriptor: descriptor_of(buffer),
                key: path.buffer_key(segment),
                expectation: BufferExpectation { rule, nullable },
            })
        };

        let (inputs, derivation) = match &node.kind {
            NodeKind::Primitive { dtype, data } => (
                vec![input(data, None, DTypeRule::Compatible(*dtype), nullable)?],
                Derivation::Primitive(*dtype),
            ),
            NodeKind::ListCount { counts, .. } => (
                vec![input(counts, Some(&S::ListCount), DTypeRule::Integral, nullable)?],
                Derivation::Counts,
            ),
            NodeKind::ListOffset { offsets, .. } => (
                vec![input(offsets, Some(&S::ListOffset), DTypeRule::Integral, nullable)?],
                Derivation::Offsets,
            ),
            NodeKind::ListBeginEnd { begin, end, .. } => (
                vec![
                    input(begin, Some(&S::ListBegin), DTypeRule::Integral, nullable)?,
                    input(end, Some(&S::ListEnd), DTypeRule::Integral, false)?,
                ],
                Derivation::BeginEnd,
            ),
            NodeKind::Record { .. } | NodeKind::Tuple { .. } => {
                return Ok(Node::new(node.kind.clone(), false));
            }
            NodeKind::UnionDense {
                tags,
                possibilities,
            } => (
                vec![input(tags, Some(&S::UnionTag), DTypeRule::Integral, nullable)?],
                Derivation::Tags(possibilities.len()),
            ),
            NodeKind::UnionDenseOffset { tags, offsets, .. } => (
                vec![
                    input(tags, Some(&S::UnionTag), DTypeRule::Integral, nullable)?,
                    input(offsets, Some(&S::UnionOffset), DTypeRule::Integral, false)?,
                ],
                Derivation::TagsOffsets,
            ),
            NodeKind::Pointer { index, .. } => (
                vec![input(index, Some(&S::PointerIndex), DTypeRule::Integral, nullable)?],
                Derivation::Index,
            ),
        };

        let loader = NodeLoader {
            source: self.source.clone(),
            inputs,
            derivation,
        };
        let label = path.format();
        let group = if self.options.lazy {
            LazyBuffers::pending(label, Box::new(move || loader.load()))
        } else {
            LazyBuffers::ready(label, loader.load()?)
        };
        let slot = |i: usize| BufferRef::Bound(BoundBuffer::new(group.clone(), i));

        let kind = match &node.kind {
            NodeKind::Primitive { dtype, .. } => NodeKind::Primitive {
                dtype: *dtype,
                data: slot(0),
            },
            NodeKind::ListCount { contents, .. }
            | NodeKind::ListOffset { contents, .. }
            | NodeKind::ListBeginEnd { contents, .. } => NodeKind::ListBeginEnd {
                begin: slot(0),
                end: slot(1),
                contents: *contents,
            },
            NodeKind::UnionDense { possibilities, .. }
            | NodeKind::UnionDenseOffset { possibilities, .. } => NodeKind::UnionDenseOffset {
                tags: slot(0),
                offsets: slot(1),
                possibilities: possibilities.clone(),
            },
            NodeKind::Pointer { target, .. } => NodeKind::Pointer {
                index: slot(0),
                target: *target,
            },
            NodeKind::Record { .. } | NodeKind::Tuple { .. } => node.kind.clone(),
        };
        Ok(Node::new(kind, nullable))
    }
}

/// Resolves `schema` against `source` with a one-off [`Resolver`].
pub fn resolve(
    schema: &Schema,
    source: Arc<dyn Source>,
    options: ResolveOptions,
) -> Result<Arc<Schema>> {
    Resolver::new(source, options).resolve(schema)
}

/// The descriptor to load an input buffer from. Buffers of an already bound schema
/// are read through their group, keeping them deferred until the new group loads.
fn descriptor_of(buffer: &BufferRef) -> BufferDescriptor {
    match buffer {
        BufferRef::Descriptor(descriptor) => descriptor.clone(),
        BufferRef::Bound(bound) => {
            let bound = bound.clone();
            BufferDescriptor::thunk(move || bound.array().cloned())
        }
    }
}

struct BufferInput {
    descriptor: BufferDescriptor,
    key: String,
    expectation: BufferExpectation,
}

/// How the bound buffers of a node are computed from its loaded inputs.
#[derive(Debug, Clone, Copy)]
enum Derivation {
    /// `[data]` converted to the declared type.
    Primitive(ElementType),
    /// `[counts]` to `[begin, end]` over fresh cumulative offsets.
    Counts,
    /// `[offsets]` to `[begin, end]` views.
    Offsets,
    BeginEnd,
    /// `[tags]` to `[tags, offsets]`, given the number of possibilities.
    Tags(usize),
    TagsOffsets,
    Index,
}

/// Loads and derives the buffers of one node. Loading is idempotent, so a pending
/// group may safely run it more than once.
struct NodeLoader {
    source: Arc<dyn Source>,
    inputs: Vec<BufferInput>,
    derivation: Derivation,
}

impl NodeLoader {
    fn load(&self) -> Result<Vec<Array>> {
        let arrays = self
            .inputs
            .iter()
            .map(|input| {
                load_buffer(
                    &input.descriptor,
                    self.source.as_ref(),
                    &input.key,
                    &input.expectation,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let key = |i: usize| self.inputs[i].key.as_str();

        let derived = match (self.derivation, arrays.as_slice()) {
            (Derivation::Primitive(dtype), [data]) => vec![data.cast(dtype, key(0))?],
            (Derivation::Counts, [counts]) => {
                let offsets = derive::offsets_from_counts(counts, key(0))?;
                let mask = counts.mask().cloned();
                let (begin, end) = derive::boundary_views(&offsets, mask, key(0))?;
                vec![begin, end]
            }
            (Derivation::Offsets, [offsets]) => {
                let n = offsets.len().saturating_sub(1);
                let mask = offsets.mask().map(|mask| mask.slice(0..n));
                let (begin, end) = derive::boundary_views(offsets, mask, key(0))?;
                vec![begin, end]
            }
            (Derivation::BeginEnd, [begin, end]) => {
                same_length(begin, end, key(1))?;
                vec![begin.to_index_array(key(0))?, end.to_index_array(key(1))?]
            }
            (Derivation::Tags(possibilities), [tags]) => {
                let tags = tags.to_index_array(key(0))?;
                let offsets = derive::union_offsets(&tags, possibilities, key(0))?;
                vec![tags, offsets]
            }
            (Derivation::TagsOffsets, [tags, offsets]) => {
                same_length(tags, offsets, key(1))?;
                vec![tags.to_index_array(key(0))?, offsets.to_index_array(key(1))?]
            }
            (Derivation::Index, [index]) => vec![index.to_index_array(key(0))?],
            (derivation, arrays) => {
                return Err(Error::invalid_operation(format!(
                    "{derivation:?} of {} buffers",
                    arrays.len()
                )));
            }
        };
        Ok(derived)
    }
}

fn same_length(first: &Array, second: &Array, key: &str) -> Result<()> {
    if first.len() != second.len() {
        return Err(Error::shape_mismatch(
            key,
            format!("length {} differs from its pair's {}", second.len(), first.len()),
        ));
    }
    Ok(())
}
