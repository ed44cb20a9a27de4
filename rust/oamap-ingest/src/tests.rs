use oamap_buffers::{BufferDescriptor, Complex64, ElementType, Scalar};
use oamap_common::error::ErrorKind;
use oamap_resolve::ResolveOptions;
use oamap_schema::{HostObject, HostValue, NodeKind, PathNaming, RuntimeTag, Schema, SchemaBuilder};
use oamap_testkit::{data_gen, fixtures, for_each_seed};

use crate::{IngestConfig, Ingested, Ingestor, IntermediateKind, infer, infer_rows};

fn ingest(value: &HostValue) -> Ingested {
    Ingestor::default().ingest(value).unwrap()
}

fn values(ingested: &Ingested, key: &str) -> Vec<Option<Scalar>> {
    ingested
        .buffers
        .get(key)
        .unwrap_or_else(|| panic!("no buffer {key}"))
        .to_scalars()
}

fn uints(values: &[u64]) -> Vec<Option<Scalar>> {
    values.iter().map(|&v| Some(Scalar::UInt(v))).collect()
}

fn kind_name(schema: &Schema, id: oamap_schema::NodeId) -> &'static str {
    schema.node(id).kind.name()
}

fn contents(schema: &Schema, id: oamap_schema::NodeId) -> oamap_schema::NodeId {
    match &schema.node(id).kind {
        NodeKind::ListOffset { contents, .. } => *contents,
        other => panic!("not an offset list: {other:?}"),
    }
}

fn primitive_type(schema: &Schema, id: oamap_schema::NodeId) -> ElementType {
    match &schema.node(id).kind {
        NodeKind::Primitive { dtype, .. } => *dtype,
        other => panic!("not a primitive: {other:?}"),
    }
}

#[test]
fn test_scalar() {
    let ingested = ingest(&HostValue::Float(3.14));
    let schema = &ingested.schema;
    assert_eq!(primitive_type(schema, schema.root()), ElementType::Float64);
    assert_eq!(values(&ingested, "object"), vec![Some(Scalar::Float(3.14))]);
}

#[test]
fn test_jagged_integers() {
    let ingested = ingest(&fixtures::jagged());
    let schema = &ingested.schema;
    let inner = contents(schema, schema.root());
    let leaf = contents(schema, inner);
    assert_eq!(primitive_type(schema, leaf), ElementType::UInt8);

    assert_eq!(values(&ingested, "object-Lo"), uints(&[0, 3]));
    assert_eq!(values(&ingested, "object-Ld-Lo"), uints(&[0, 3, 3, 5]));
    assert_eq!(values(&ingested, "object-Ld-Ld"), uints(&[3, 2, 1, 4, 5]));
    assert_eq!(ingested.buffers.len(), 3);
}

#[test]
fn test_heterogeneous_list_becomes_union() {
    let ingested = ingest(&fixtures::heterogeneous());
    let schema = &ingested.schema;
    let union = contents(schema, schema.root());
    let NodeKind::UnionDense { possibilities, .. } = &schema.node(union).kind else {
        panic!("not a dense union: {:?}", schema.node(union).kind);
    };
    assert_eq!(possibilities.len(), 2);
    assert_eq!(primitive_type(schema, possibilities[0]), ElementType::UInt8);
    assert_eq!(kind_name(schema, possibilities[1]), "ListOffset");

    assert_eq!(values(&ingested, "object-Ld-Ut"), uints(&[0, 1, 0]));
    assert_eq!(values(&ingested, "object-Ld-Uo"), uints(&[0, 0, 1]));
    assert_eq!(values(&ingested, "object-Ld-Ud0"), uints(&[0, 255]));
    assert_eq!(values(&ingested, "object-Ld-Ud1-Lo"), uints(&[0, 1]));
    assert_eq!(values(&ingested, "object-Ld-Ud1-Ld"), uints(&[0]));
    assert_eq!(
        ingested.buffers.get("object-Ld-Ut").unwrap().dtype(),
        ElementType::UInt8
    );
}

#[test]
fn test_record_widening() {
    let ingested = ingest(&fixtures::widening_records());
    let schema = &ingested.schema;
    let record = contents(schema, schema.root());
    let NodeKind::Record { name, fields, .. } = &schema.node(record).kind else {
        panic!("not a record");
    };
    assert_eq!(name, "Record-0");
    let names = fields.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["one", "two"]);
    for (_, field) in fields {
        assert_eq!(primitive_type(schema, *field), ElementType::Float64);
    }
    assert_eq!(
        values(&ingested, "object-Ld-R_one"),
        vec![Some(Scalar::Float(1.0)), Some(Scalar::Float(2.71))]
    );
}

#[test]
fn test_nullable_leaf() {
    let ingested = ingest(&fixtures::nullable_leaf());
    let schema = &ingested.schema;
    let leaf = contents(schema, schema.root());
    assert!(schema.node(leaf).nullable);
    assert_eq!(primitive_type(schema, leaf), ElementType::UInt8);
    let data = values(&ingested, "object-Ld");
    assert_eq!(
        data,
        vec![Some(Scalar::UInt(1)), None, Some(Scalar::UInt(3))]
    );
    let array = ingested.buffers.get("object-Ld").unwrap();
    assert_eq!(array.len(), 3);
    assert!(array.is_null(1));
}

#[test]
fn test_nullable_lists_keep_boundaries() {
    let value = HostValue::List(vec![
        HostValue::from(vec![1i64, 2]),
        HostValue::Null,
        HostValue::from(vec![3i64]),
    ]);
    let ingested = ingest(&value);
    let inner = contents(&ingested.schema, ingested.schema.root());
    assert!(ingested.schema.node(inner).nullable);
    let offsets = ingested.buffers.get("object-Ld-Lo").unwrap();
    assert_eq!(offsets.len(), 4);
    assert_eq!(
        offsets.to_scalars(),
        vec![Some(Scalar::UInt(0)), None, Some(Scalar::UInt(2)), Some(Scalar::UInt(3))]
    );
    assert_eq!(offsets.get(1), Some(Scalar::UInt(2)));
}

#[test]
fn test_cycle_refusal() {
    let err = Ingestor::default()
        .ingest(&fixtures::self_referencing())
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::CyclicInput { .. }), "{err}");
}

#[test]
fn test_shared_object_is_not_a_cycle() {
    let shared = HostObject::new("Point").with_attribute("x", HostValue::Int(1));
    let value = HostValue::List(vec![shared.clone().into(), shared.into()]);
    let ingested = ingest(&value);
    assert_eq!(values(&ingested, "object-Ld-R_x"), uints(&[1, 1]));
}

#[test]
fn test_unresolvable_positions() {
    for value in [
        HostValue::Null,
        HostValue::from(vec![None::<i64>, None]),
        HostValue::List(vec![]),
        HostValue::from(vec![Vec::<i64>::new(), Vec::new()]),
    ] {
        let err = Ingestor::default().ingest(&value).unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::TypeUnresolvable { .. }),
            "{value:?}: {err}"
        );
    }
}

#[test]
fn test_unresolvable_position_is_named() {
    let value = HostValue::mapping([("a", HostValue::Null)]);
    let err = Ingestor::default().ingest(&value).unwrap_err();
    match err.kind() {
        ErrorKind::TypeUnresolvable { context } => assert_eq!(context, "object-R_a"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_missing_field() {
    let mut builder = SchemaBuilder::new();
    let x = builder.primitive(ElementType::Int64);
    let y = builder.primitive(ElementType::Int64);
    let record = builder
        .record(vec![("x".to_string(), x), ("y".to_string(), y)])
        .unwrap();
    let schema = builder.finish(record).unwrap();

    let err = Ingestor::default()
        .fill(&schema, &[HostValue::mapping([("x", HostValue::Int(1))])])
        .unwrap_err();
    match err.kind() {
        ErrorKind::MissingField { field, .. } => assert_eq!(field, "y"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_tuple_length_mismatch() {
    let mut builder = SchemaBuilder::new();
    let a = builder.primitive(ElementType::Int64);
    let b = builder.primitive(ElementType::Float64);
    let tuple = builder.tuple(vec![a, b]);
    let schema = builder.finish(tuple).unwrap();

    let err = Ingestor::default()
        .fill(&schema, &[HostValue::Tuple(vec![HostValue::Int(1)])])
        .unwrap_err();
    match err.kind() {
        ErrorKind::LengthMismatch {
            expected, actual, ..
        } => assert_eq!((*expected, *actual), (2, 1)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_no_compatible_possibility() {
    let mut builder = SchemaBuilder::new();
    let small = builder.primitive(ElementType::UInt8);
    let flag = builder.primitive(ElementType::Boolean);
    let list = builder.list_offset(flag);
    let union = builder.union_of(vec![small, list], false).unwrap();
    let schema = builder.finish(union).unwrap();

    let filled = Ingestor::default()
        .fill(&schema, &[HostValue::Int(7), HostValue::from(vec![true])])
        .unwrap();
    assert_eq!(filled.get("object-Ut").unwrap().len(), 2);

    let err = Ingestor::default()
        .fill(&schema, &[HostValue::Int(1000)])
        .unwrap_err();
    assert!(
        matches!(err.kind(), ErrorKind::NoCompatiblePossibility { .. }),
        "{err}"
    );
}

#[test]
fn test_pointer_fill_is_not_implemented() {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive(ElementType::Int64);
    let pointer = builder.pointer_placeholder(BufferDescriptor::Default, false);
    builder.set_pointer_target(pointer, leaf).unwrap();
    let list = builder.list_offset(pointer);
    let schema = builder.finish(list).unwrap();

    let err = Ingestor::default()
        .fill(&schema, &[HostValue::from(vec![1i64])])
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotImplemented { .. }), "{err}");
}

#[test]
fn test_value_not_admitted() {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive(ElementType::Int64);
    let schema = builder.finish(leaf).unwrap();
    let err = Ingestor::default()
        .fill(&schema, &[HostValue::from(vec![1i64])])
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }), "{err}");
}

#[test]
fn test_explicit_keys() {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive_with(
        ElementType::Int32,
        BufferDescriptor::Key("values".to_string()),
        false,
    );
    let list = builder.list_offset_with(leaf, BufferDescriptor::Key("bounds".to_string()), false);
    let schema = builder.finish(list).unwrap();

    let buffers = Ingestor::default()
        .fill(&schema, &[HostValue::from(vec![5i64, 6])])
        .unwrap();
    let mut keys = buffers.keys().collect::<Vec<_>>();
    keys.sort();
    assert_eq!(keys, ["bounds", "values"]);
    assert_eq!(buffers.get("values").unwrap().dtype(), ElementType::Int32);
}

#[test]
fn test_fields_are_sorted() {
    let value = HostValue::mapping([
        ("zeta", HostValue::Int(1)),
        ("alpha", HostValue::Bool(true)),
        ("mid", HostValue::Float(0.5)),
    ]);
    let intermediate = infer(&value).unwrap();
    let IntermediateKind::Record { fields, .. } = intermediate.kind else {
        panic!("not a record");
    };
    let names = fields.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["alpha", "mid", "zeta"]);
}

#[test]
fn test_runtime_tags() {
    let point = HostValue::NamedTuple {
        name: "Point".to_string(),
        fields: vec!["x".to_string(), "y".to_string()],
        values: vec![HostValue::Int(1), HostValue::Int(2)],
    };
    let schema = Ingestor::default()
        .infer_schema(std::slice::from_ref(&point))
        .unwrap();
    let NodeKind::Record { runtime, .. } = &schema.root_node().kind else {
        panic!("not a record");
    };
    assert_eq!(
        runtime.as_ref(),
        Some(&RuntimeTag {
            name: "Point".to_string(),
            args: vec!["x".to_string(), "y".to_string()],
        })
    );

    let object = HostObject::new("Particle").with_attribute("mass", HostValue::Float(1.5));
    let schema = Ingestor::default()
        .infer_schema(&[HostValue::Object(object)])
        .unwrap();
    let NodeKind::Record { runtime, .. } = &schema.root_node().kind else {
        panic!("not a record");
    };
    assert_eq!(runtime.as_ref().map(|r| r.name.as_str()), Some("Particle"));
}

#[test]
fn test_nullable_record_is_carried_by_union() {
    let value = HostValue::List(vec![
        HostValue::mapping([("a", HostValue::Int(1))]),
        HostValue::Null,
    ]);
    let ingested = ingest(&value);
    let schema = &ingested.schema;
    let union = contents(schema, schema.root());
    let node = schema.node(union);
    assert!(node.nullable);
    let NodeKind::UnionDense { possibilities, .. } = &node.kind else {
        panic!("not a union: {:?}", node.kind);
    };
    assert_eq!(possibilities.len(), 1);
    assert_eq!(kind_name(schema, possibilities[0]), "Record");
    assert_eq!(
        values(&ingested, "object-Ld-Ut"),
        vec![Some(Scalar::UInt(0)), None]
    );
    assert_eq!(values(&ingested, "object-Ld-Ud0-R_a"), uints(&[1]));
}

#[test]
fn test_signed_and_complex_numbers() {
    let value = HostValue::from(vec![-3i64, 100]);
    let schema = Ingestor::default().infer_schema(&[value]).unwrap();
    assert_eq!(
        primitive_type(&schema, contents(&schema, schema.root())),
        ElementType::Int8
    );

    let value = HostValue::List(vec![
        HostValue::Int(1),
        HostValue::Complex(Complex64::new(0.0, 1.0)),
    ]);
    let ingested = ingest(&value);
    let leaf = contents(&ingested.schema, ingested.schema.root());
    assert_eq!(primitive_type(&ingested.schema, leaf), ElementType::Complex128);
    assert_eq!(
        values(&ingested, "object-Ld")[0],
        Some(Scalar::Complex(Complex64::new(1.0, 0.0)))
    );
}

#[test]
fn test_rows_share_one_schema() {
    let rows = [HostValue::Int(1), HostValue::Float(0.5), HostValue::Int(7)];
    let ingested = Ingestor::default().ingest_rows(&rows).unwrap();
    assert_eq!(
        primitive_type(&ingested.schema, ingested.schema.root()),
        ElementType::Float64
    );
    assert_eq!(
        values(&ingested, "object"),
        vec![
            Some(Scalar::Float(1.0)),
            Some(Scalar::Float(0.5)),
            Some(Scalar::Float(7.0))
        ]
    );
}

#[test]
fn test_custom_naming_resolves() {
    let config = IngestConfig::default()
        .with_naming(PathNaming::default().with_prefix("t").with_delimiter('.'));
    let ingested = Ingestor::new(config).ingest(&fixtures::jagged()).unwrap();
    assert!(ingested.buffers.contains_key("t.Ld.Lo"));
    assert_eq!(ingested.naming().root().format(), "t");

    let bound = ingested.resolve(ResolveOptions::default()).unwrap();
    assert!(bound.is_bound());
    assert!(!ingested.schema.is_bound());
}

#[test]
fn test_small_chunks() {
    let config = IngestConfig::default().with_chunk_bytes(IngestConfig::MIN_CHUNK_BYTES);
    let value = HostValue::from((0..1000i64).collect::<Vec<_>>());
    let ingested = Ingestor::new(config).ingest(&value).unwrap();
    let data = ingested.buffers.get("object-Ld").unwrap();
    assert_eq!(data.dtype(), ElementType::UInt16);
    assert_eq!(data.len(), 1000);
    assert_eq!(data.get(999), Some(Scalar::UInt(999)));
}

#[test]
fn test_config() {
    assert!(IngestConfig::default().validate().is_ok());
    assert!(IngestConfig::default().with_chunk_bytes(1).validate().is_err());
    assert!(
        Ingestor::new(IngestConfig::default().with_chunk_bytes(1))
            .ingest(&HostValue::Int(1))
            .is_err()
    );

    let config: IngestConfig = serde_json::from_str(r#"{"chunk_bytes": 4096}"#).unwrap();
    assert_eq!(config.chunk_bytes, 4096);
    assert_eq!(config.naming, PathNaming::default());
    let text = serde_json::to_string(&config).unwrap();
    let back: IngestConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_inference_admits_every_row() {
    for_each_seed(64, |seed| {
        let (_, rows) = data_gen::host_rows(seed, 6).unwrap();
        let schema = Ingestor::default().infer_schema(&rows).unwrap();
        for row in &rows {
            assert!(schema.is_instance(schema.root(), row), "{row:?}");
        }
    });
}

#[test]
fn test_inference_widens_pairs() {
    for_each_seed(64, |seed| {
        let (_, a) = data_gen::host_rows(seed, 1).unwrap();
        let (_, b) = data_gen::host_rows(seed + 1000, 1).unwrap();
        let merged = infer_rows([&a[0], &b[0]]).unwrap();
        let mut builder = SchemaBuilder::new();
        let root = crate::lower(&merged, &mut builder).unwrap();
        let schema = builder.finish(root).unwrap();
        assert!(schema.is_instance(root, &a[0]));
        assert!(schema.is_instance(root, &b[0]));
    });
}

#[test]
fn test_generated_rows_fill_and_resolve() {
    for_each_seed(32, |seed| {
        let (_, rows) = data_gen::host_rows(seed, 5).unwrap();
        let ingested = Ingestor::default().ingest_rows(&rows).unwrap();
        let bound = ingested.resolve(ResolveOptions::default()).unwrap();
        assert!(bound.is_bound());
    });
}

#[test]
fn test_wider_record_keeps_its_fields() {
    for rows in [
        vec![
            HostValue::mapping([("a", HostValue::Int(1))]),
            HostValue::mapping([("a", HostValue::Int(1)), ("b", HostValue::Int(2))]),
        ],
        vec![
            HostValue::mapping([("a", HostValue::Int(1)), ("b", HostValue::Int(2))]),
            HostValue::mapping([("a", HostValue::Int(1))]),
        ],
    ] {
        let ingested = ingest(&HostValue::List(rows.clone()));
        let schema = &ingested.schema;
        let union = contents(schema, schema.root());
        let NodeKind::UnionDense { possibilities, .. } = &schema.node(union).kind else {
            panic!("not a dense union: {:?}", schema.node(union).kind);
        };
        let wide = possibilities
            .iter()
            .position(|&p| {
                matches!(&schema.node(p).kind, NodeKind::Record { fields, .. } if fields.len() == 2)
            })
            .unwrap();
        let tags = rows
            .iter()
            .map(|row| if row.field("b").is_some() { wide as u64 } else { 1 - wide as u64 })
            .collect::<Vec<_>>();
        assert_eq!(values(&ingested, "object-Ld-Ut"), uints(&tags));
        assert_eq!(
            values(&ingested, &format!("object-Ld-Ud{wide}-R_b")),
            uints(&[2])
        );
        for row in &rows {
            assert!(schema.is_exact_instance(union, row));
        }
    }
}

#[test]
fn test_wider_nested_record_keeps_its_fields() {
    let row = |inner: HostValue| HostValue::mapping([("p", inner)]);
    let value = HostValue::List(vec![
        row(HostValue::mapping([("x", HostValue::Int(1))])),
        row(HostValue::mapping([("x", HostValue::Int(2)), ("y", HostValue::Int(3))])),
    ]);
    let ingested = ingest(&value);
    let schema = &ingested.schema;
    assert!(schema.is_exact_instance(schema.root(), &value));
    let y = ingested
        .buffers
        .iter()
        .find(|(key, _)| key.ends_with("-R_y"))
        .map(|(_, array)| array.to_scalars())
        .unwrap();
    assert_eq!(y, uints(&[3]));
}

#[test]
fn test_records_without_fields_are_unresolvable() {
    for value in [
        HostValue::Mapping(vec![]),
        HostValue::List(vec![HostValue::Mapping(vec![]), HostValue::Mapping(vec![])]),
        HostValue::Tuple(vec![]),
        HostValue::mapping([("inner", HostValue::Mapping(vec![]))]),
    ] {
        let err = Ingestor::default().ingest(&value).unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::TypeUnresolvable { .. }),
            "{value:?}: {err}"
        );
    }
    let err = Ingestor::default()
        .ingest(&HostValue::List(vec![HostValue::Mapping(vec![])]))
        .unwrap_err();
    match err.kind() {
        ErrorKind::TypeUnresolvable { context } => assert_eq!(context, "object-Ld"),
        other => panic!("unexpected {other:?}"),
    }
}
