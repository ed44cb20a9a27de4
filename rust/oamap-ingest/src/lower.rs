use oamap_buffers::{BufferDescriptor, ElementType};
use oamap_common::{Result, error::Error};
use oamap_schema::{NodeId, PathNaming, PathSegment, SchemaBuilder, SchemaPath};

use crate::intermediate::{Intermediate, IntermediateKind, NumberRange};

/// Adds the concrete schema of `intermediate` to `builder` and returns its root.
///
/// # Errors
///
/// Fails with `TypeUnresolvable` where nothing but nulls or empty lists were
/// observed.
pub fn lower(intermediate: &Intermediate, builder: &mut SchemaBuilder) -> Result<NodeId> {
    lower_with(intermediate, builder, &PathNaming::default())
}

/// Like [`lower`], naming unresolvable positions with `naming` in errors.
pub fn lower_with(
    intermediate: &Intermediate,
    builder: &mut SchemaBuilder,
    naming: &PathNaming,
) -> Result<NodeId> {
    lower_at(intermediate, builder, &naming.root())
}

fn lower_at(
    intermediate: &Intermediate,
    builder: &mut SchemaBuilder,
    path: &SchemaPath,
) -> Result<NodeId> {
    let nullable = intermediate.missing;
    let id = match &intermediate.kind {
        IntermediateKind::Unknown => {
            return Err(Error::type_unresolvable(path.format()));
        }
        IntermediateKind::Boolean => {
            builder.primitive_with(ElementType::Boolean, BufferDescriptor::Default, nullable)
        }
        IntermediateKind::Number(range) => {
            builder.primitive_with(number_type(range), BufferDescriptor::Default, nullable)
        }
        IntermediateKind::List(element) => {
            let contents = lower_at(element, builder, &path.child(PathSegment::ListData))?;
            builder.list_offset_with(contents, BufferDescriptor::Default, nullable)
        }
        // A structure without children has no buffer to carry its length.
        IntermediateKind::Record { fields, .. } if fields.is_empty() => {
            return Err(Error::type_unresolvable(path.format()));
        }
        IntermediateKind::Tuple { items, .. } if items.is_empty() => {
            return Err(Error::type_unresolvable(path.format()));
        }
        IntermediateKind::Record { fields, runtime } => {
            let fields = fields
                .iter()
                .map(|(name, field)| {
                    let child = path.child(PathSegment::RecordField(name.clone()));
                    Ok((name.clone(), lower_at(field, builder, &child)?))
                })
                .collect::<Result<Vec<_>>>()?;
            let record = builder.record_with(None, runtime.clone(), fields)?;
            nullable_structure(builder, record, nullable)?
        }
        IntermediateKind::Tuple { items, runtime } => {
            let items = items
                .iter()
                .enumerate()
                .map(|(i, item)| lower_at(item, builder, &path.child(PathSegment::TupleIndex(i))))
                .collect::<Result<Vec<_>>>()?;
            let tuple = builder.tuple_with(runtime.clone(), items);
            nullable_structure(builder, tuple, nullable)?
        }
        IntermediateKind::Union(alternatives) => {
            let possibilities = alternatives
                .iter()
                .enumerate()
                .map(|(k, alt)| lower_at(alt, builder, &path.child(PathSegment::UnionData(k))))
                .collect::<Result<Vec<_>>>()?;
            builder.union_of(possibilities, nullable)?
        }
    };
    Ok(id)
}

/// Records and tuples are never nullable themselves; a null among them is carried by
/// a nullable single-possibility union.
fn nullable_structure(builder: &mut SchemaBuilder, id: NodeId, nullable: bool) -> Result<NodeId> {
    if nullable {
        builder.union_of(vec![id], true)
    } else {
        Ok(id)
    }
}

/// The narrowest element type holding every number in `range`.
fn number_type(range: &NumberRange) -> ElementType {
    if !range.real {
        ElementType::Complex128
    } else if !range.whole {
        ElementType::Float64
    } else if range.min >= 0 {
        ElementType::smallest_unsigned(range.max).unwrap_or(ElementType::Float64)
    } else {
        ElementType::smallest_signed(range.min, range.max).unwrap_or(ElementType::Float64)
    }
}

#[cfg(test)]
mod tests {
    use oamap_buffers::ElementType;

    use super::number_type;
    use crate::intermediate::NumberRange;

    fn whole(min: i128, max: i128) -> NumberRange {
        NumberRange {
            min,
            max,
            whole: true,
            real: true,
        }
    }

    #[test]
    fn test_number_type() {
        assert_eq!(number_type(&whole(0, 255)), ElementType::UInt8);
        assert_eq!(number_type(&whole(0, 256)), ElementType::UInt16);
        assert_eq!(number_type(&whole(-1, 127)), ElementType::Int8);
        assert_eq!(number_type(&whole(-1, 128)), ElementType::Int16);
        assert_eq!(number_type(&whole(0, u64::MAX as i128)), ElementType::UInt64);
        assert_eq!(number_type(&whole(0, u64::MAX as i128 + 1)), ElementType::Float64);
        assert_eq!(number_type(&whole(i64::MIN as i128 - 1, 0)), ElementType::Float64);
        assert_eq!(number_type(&NumberRange::float(1.0)), ElementType::Float64);
        assert_eq!(number_type(&NumberRange::complex(1.0)), ElementType::Complex128);
    }
}
