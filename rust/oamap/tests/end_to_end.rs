use std::sync::Arc;

use oamap::{
    ErrorKind, HostObject, HostValue, Ingestor, ResolveOptions, SchemaBuilder, Value,
    buffers::{Array, BufferDescriptor, BufferMap, ElementType, Source},
    from_data, from_json, from_rows, open,
    schema::NodeKind,
};
use oamap_testkit::fixtures;
use serde_json::json;

#[test]
fn test_scalar_roundtrip() {
    let root = from_data(&HostValue::Float(3.14)).unwrap();
    assert_eq!(root.len().unwrap(), 1);
    assert_eq!(root.get(0).unwrap(), Value::Float(3.14));
    assert_eq!(root.value().unwrap().as_f64(), Some(3.14));
}

#[test]
fn test_jagged_integers() {
    let root = from_data(&fixtures::jagged()).unwrap();
    let rows = root.value().unwrap();
    let rows = rows.as_list().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.get(1).unwrap().as_list().unwrap().len(), 0);
    assert_eq!(rows.get(2).unwrap().at(1).unwrap(), Value::UInt(5));
    assert_eq!(rows.get(-1).unwrap().at(-2).unwrap(), Value::UInt(4));
    assert_eq!(rows.to_json().unwrap(), json!([[3, 2, 1], [], [4, 5]]));
}

#[test]
fn test_heterogeneous_list() {
    let root = from_data(&fixtures::heterogeneous()).unwrap();
    let rows = root.value().unwrap();
    assert_eq!(rows.at(0).unwrap(), Value::UInt(0));
    let nested = rows.at(1).unwrap();
    assert_eq!(nested.as_list().unwrap().len(), 1);
    assert_eq!(nested.at(0).unwrap(), Value::UInt(0));
    assert_eq!(rows.at(2).unwrap(), Value::UInt(255));
    assert_eq!(rows.to_json().unwrap(), json!([0, [0], 255]));
}

#[test]
fn test_record_widening() {
    let root = from_data(&fixtures::widening_records()).unwrap();
    let rows = root.value().unwrap();
    let first = rows.at(0).unwrap();
    assert_eq!(first.field("one").unwrap(), Value::Float(1.0));
    assert_eq!(rows.at(1).unwrap().field("one").unwrap(), Value::Float(2.71));
    let record = first.as_record().unwrap();
    assert_eq!(record.field_names().collect::<Vec<_>>(), ["one", "two"]);
    assert_eq!(
        root.to_json().unwrap(),
        json!([[{"one": 1.0, "two": 3.14}, {"one": 2.71, "two": 99.9}]])
    );
}

#[test]
fn test_nullable_leaf() {
    let root = from_data(&fixtures::nullable_leaf()).unwrap();
    let rows = root.value().unwrap();
    assert_eq!(rows.at(0).unwrap(), Value::UInt(1));
    assert!(rows.at(1).unwrap().is_null());
    assert_eq!(rows.at(2).unwrap(), Value::UInt(3));
    assert_eq!(rows.to_json().unwrap(), json!([1, null, 3]));
}

#[test]
fn test_cycle_refusal() {
    let err = from_data(&fixtures::self_referencing()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::CyclicInput { .. }), "{err}");
}

#[test]
fn test_json_documents() {
    let document = json!({
        "hits": [{"x": 1, "y": -2}, {"x": 3, "y": 4}],
        "weight": 0.5,
        "flags": [true, false, null]
    });
    let root = from_json(&document).unwrap();
    assert_eq!(root.value().unwrap().to_json().unwrap(), document);
    let hits = root.value().unwrap().field("hits").unwrap();
    assert_eq!(hits.at(-1).unwrap().field("y").unwrap(), Value::Int(4));

    let err = from_json(&json!({"name": "x"})).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
}

#[test]
fn test_records_with_differing_fields() {
    for document in [
        json!([{"a": 1}, {"a": 1, "b": 2}]),
        json!([{"x": 1, "y": 2}, {"x": 1}]),
        json!([{"p": {"x": 1}}, {"p": {"x": 2, "y": 0.5}}, {"p": {"y": 1.5}}]),
    ] {
        let root = from_json(&document).unwrap();
        assert_eq!(root.value().unwrap().to_json().unwrap(), document);
    }

    for document in [json!({}), json!([{}, {}])] {
        let err = from_json(&document).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeUnresolvable { .. }), "{err}");
    }
}

#[test]
fn test_rows() {
    let rows = [
        HostValue::from(vec![1i64, 2]),
        HostValue::from(vec![Some(3i64), None]),
        HostValue::List(vec![]),
    ];
    let root = from_rows(&rows).unwrap();
    assert_eq!(root.len().unwrap(), 3);
    assert_eq!(root.get(-1).unwrap().as_list().unwrap().len(), 0);
    assert_eq!(root.to_json().unwrap(), json!([[1, 2], [3, null], []]));
}

#[test]
fn test_empty_lists_at_every_level() {
    let value = HostValue::List(vec![
        HostValue::from(vec![Vec::<i64>::new()]),
        HostValue::List(vec![]),
        HostValue::from(vec![vec![7i64]]),
    ]);
    let root = from_data(&value).unwrap();
    assert_eq!(root.to_json().unwrap(), json!([[[[]], [], [[7]]]]));
}

#[test]
fn test_single_field_record() {
    let value = HostValue::from(vec![HostValue::mapping([("only", HostValue::Bool(true))])]);
    let root = from_data(&value).unwrap();
    let record = root.value().unwrap().at(0).unwrap();
    assert_eq!(record.as_record().unwrap().len(), 1);
    assert_eq!(record.field("only").unwrap(), Value::Bool(true));
    let err = record.field("other").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingField { .. }));
}

#[test]
fn test_all_null_column_is_refused() {
    let value = HostValue::List(vec![
        HostValue::mapping([("a", HostValue::Int(1)), ("b", HostValue::Null)]),
        HostValue::mapping([("a", HostValue::Int(2)), ("b", HostValue::Null)]),
    ]);
    let err = from_data(&value).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeUnresolvable { .. }));
}

#[test]
fn test_objects_and_named_tuples() {
    let particle = |mass: f64| {
        HostValue::Object(HostObject::new("Particle").with_attribute("mass", HostValue::Float(mass)))
    };
    let value = HostValue::List(vec![particle(1.5), particle(2.5)]);
    let root = from_data(&value).unwrap();
    let first = root.value().unwrap().at(0).unwrap();
    let record = first.as_record().unwrap();
    assert_eq!(record.runtime().map(|r| r.name.as_str()), Some("Particle"));
    assert_eq!(first.field("mass").unwrap(), Value::Float(1.5));

    let pair = HostValue::NamedTuple {
        name: "Pair".to_string(),
        fields: vec!["left".to_string(), "right".to_string()],
        values: vec![HostValue::Int(1), HostValue::Bool(false)],
    };
    let root = from_data(&pair).unwrap();
    assert_eq!(root.to_json().unwrap(), json!([{"left": 1, "right": false}]));
}

#[test]
fn test_tuples() {
    let value = HostValue::List(vec![
        HostValue::Tuple(vec![HostValue::Int(1), HostValue::Float(0.5)]),
        HostValue::Tuple(vec![HostValue::Int(2), HostValue::Float(1.5)]),
    ]);
    let root = from_data(&value).unwrap();
    let rows = root.value().unwrap();
    let second = rows.at(1).unwrap();
    let tuple = second.as_tuple().unwrap();
    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple.get(1).unwrap(), Value::Float(1.5));
    // Tuples read back as sequences.
    assert_eq!(rows.to_json().unwrap(), json!([[1, 0.5], [2, 1.5]]));
}

#[test]
fn test_negative_indices_and_slices() {
    let value = HostValue::from((0..10i64).collect::<Vec<_>>());
    let root = from_data(&value).unwrap();
    let list = root.value().unwrap();
    let list = list.as_list().unwrap();
    assert_eq!(list.get(-1).unwrap(), Value::UInt(9));
    assert_eq!(list.get(-10).unwrap(), Value::UInt(0));
    for index in [10, -11] {
        let err = list.get(index).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange { .. }));
    }

    let reversed = list.slice(Some(3), None, Some(-2)).unwrap();
    assert_eq!(reversed.to_json().unwrap(), json!([3, 1]));
    let crossing = list.slice(Some(-8), Some(-11), Some(-3)).unwrap();
    assert_eq!(crossing.to_json().unwrap(), json!([2]));
    let tail = list.slice(Some(-3), None, None).unwrap();
    assert_eq!(tail.to_json().unwrap(), json!([7, 8, 9]));
    assert_eq!(tail.slice(None, None, Some(-1)).unwrap().to_json().unwrap(), json!([9, 8, 7]));
}

#[test]
fn test_proxies_are_immutable() {
    let root = from_data(&fixtures::jagged()).unwrap();
    let mut list = root.value().unwrap().as_list().unwrap().clone();
    let err = list.append(Value::UInt(1)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ImmutableValue { .. }));
    assert_eq!(list.len(), 3);
}

#[test]
fn test_pointer_to_containing_list() {
    let mut builder = SchemaBuilder::new();
    let v = builder.primitive(ElementType::UInt8);
    let up = builder.pointer_placeholder(BufferDescriptor::Default, false);
    let record = builder
        .record(vec![("up".to_string(), up), ("v".to_string(), v)])
        .unwrap();
    let list = builder.list_offset(record);
    builder.set_pointer_target(up, list).unwrap();
    let schema = builder.finish(list).unwrap();

    let source: Arc<dyn Source> = Arc::new(
        [
            ("object-Lo", Array::from_vec(vec![0u64, 3])),
            ("object-Ld-R_v", Array::from_vec(vec![10u8, 20, 30])),
            ("object-Ld-R_up-Px", Array::from_vec(vec![0u64, 0, 0])),
        ]
        .into_iter()
        .map(|(key, array)| (key.to_string(), array))
        .collect::<BufferMap>(),
    );
    let root = open(&schema, source, ResolveOptions::default()).unwrap();
    let rows = root.value().unwrap();
    let containing = rows.at(2).unwrap().field("up").unwrap();
    assert_eq!(containing.as_list().unwrap().len(), 3);
    assert_eq!(
        containing.at(1).unwrap().field("up").unwrap().at(0).unwrap().field("v").unwrap(),
        Value::UInt(10)
    );
}

#[test]
fn test_lazy_resolution_of_ingested_data() {
    let ingested = Ingestor::default().ingest(&fixtures::jagged()).unwrap();
    let bound = ingested.resolve(ResolveOptions::lazy()).unwrap();
    let root = oamap::Root::new(bound).unwrap();
    assert_eq!(root.to_json().unwrap(), json!([[[3, 2, 1], [], [4, 5]]]));
}

#[test]
fn test_projection_reads_a_single_field() {
    let value = HostValue::List(vec![
        HostValue::mapping([("a", HostValue::Int(1)), ("b", HostValue::Float(0.5))]),
        HostValue::mapping([("a", HostValue::Int(2)), ("b", HostValue::Float(1.5))]),
    ]);
    let ingested = Ingestor::default().ingest(&value).unwrap();
    let schema = &ingested.schema;
    let b = schema
        .members()
        .into_iter()
        .find(|&id| {
            schema.members().into_iter().any(|owner| match &schema.node(owner).kind {
                NodeKind::Record { fields, .. } => fields.iter().any(|(n, f)| n == "b" && *f == id),
                _ => false,
            })
        })
        .unwrap();
    let projected = schema.project([schema.origin_id(b)]).unwrap();

    let mut buffers = ingested.buffers.clone();
    assert!(buffers.insert("object-Ld-R_a", Array::from_vec(vec![0u8])).is_some());
    let source: Arc<dyn Source> = Arc::new(buffers);
    let root = open(&projected, source, ResolveOptions::default()).unwrap();
    assert_eq!(root.to_json().unwrap(), json!([[{"b": 0.5}, {"b": 1.5}]]));
}
