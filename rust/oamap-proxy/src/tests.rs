use std::sync::Arc;

use oamap_buffers::{Array, BufferDescriptor, BufferMap, ElementType, Source};
use oamap_common::error::ErrorKind;
use oamap_resolve::{ResolveOptions, resolve};
use oamap_schema::{Schema, SchemaBuilder};
use serde_json::json;

use crate::{Root, Value};

fn bind(schema: Schema, entries: Vec<(&str, Array)>, options: ResolveOptions) -> Root {
    let source: Arc<dyn Source> = Arc::new(
        entries
            .into_iter()
            .map(|(key, array)| (key.to_string(), array))
            .collect::<BufferMap>(),
    );
    Root::new(resolve(&schema, source, options).unwrap()).unwrap()
}

fn offsets(values: &[u64]) -> Array {
    Array::from_vec(values.to_vec())
}

/// A single list of the given bytes.
fn byte_list(bytes: Vec<u8>) -> Root {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive(ElementType::UInt8);
    let root = builder.list_offset(leaf);
    let n = bytes.len() as u64;
    bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, n])),
            ("object-Ld", Array::from_vec(bytes)),
        ],
        ResolveOptions::default(),
    )
}

fn jagged() -> Root {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive(ElementType::UInt8);
    let inner = builder.list_offset(leaf);
    let root = builder.list_offset(inner);
    bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, 3])),
            ("object-Ld-Lo", offsets(&[0, 3, 3, 5])),
            ("object-Ld-Ld", Array::from_vec(vec![3u8, 2, 1, 4, 5])),
        ],
        ResolveOptions::default(),
    )
}

fn kind(result: crate::value::Value) -> String {
    result.kind_name().to_string()
}

#[test]
fn test_jagged_access() {
    let root = jagged();
    assert_eq!(root.len().unwrap(), 1);
    let outer = root.value().unwrap();
    let list = outer.as_list().unwrap();
    assert_eq!(list.len(), 3);
    assert!(outer.at(1).unwrap().as_list().unwrap().is_empty());
    assert_eq!(outer.at(2).unwrap().at(1).unwrap(), Value::UInt(5));
    assert_eq!(outer.at(-1).unwrap().at(-2).unwrap(), Value::UInt(4));
    assert_eq!(outer.at(-3).unwrap().at(0).unwrap().as_u64(), Some(3));
    assert_eq!(
        root.to_json().unwrap(),
        json!([[[3, 2, 1], [], [4, 5]]])
    );
}

#[test]
fn test_index_out_of_range() {
    let root = jagged();
    let outer = root.value().unwrap();
    for index in [3, -4] {
        let err = outer.at(index).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange { .. }));
    }
    assert!(outer.at(1).unwrap().at(0).is_err());
    assert!(root.get(1).is_err());
    assert_eq!(kind(root.get(-1).unwrap()), "list");
}

#[test]
fn test_slices_compose() {
    let root = byte_list((0..10).collect());
    let value = root.value().unwrap();
    let list = value.as_list().unwrap();

    let evens = list.slice(Some(2), Some(8), Some(2)).unwrap();
    assert_eq!(evens.to_json().unwrap(), json!([2, 4, 6]));
    let reversed = evens.slice(None, None, Some(-1)).unwrap();
    assert_eq!(reversed.to_json().unwrap(), json!([6, 4, 2]));
    assert_eq!(reversed.get(-1).unwrap(), Value::UInt(2));
    assert_eq!(reversed.slice(Some(1), None, None).unwrap().to_json().unwrap(), json!([4, 2]));

    let crossing = list.slice(Some(3), None, Some(-2)).unwrap();
    assert_eq!(crossing.to_json().unwrap(), json!([3, 1]));
    let tail = list.slice(Some(-3), Some(100), None).unwrap();
    assert_eq!(tail.to_json().unwrap(), json!([7, 8, 9]));
    assert!(list.slice(Some(5), Some(2), None).unwrap().is_empty());
    assert!(list.slice(Some(5), Some(2), None).unwrap().get(0).is_err());

    let err = list.slice(None, None, Some(0)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
}

#[test]
fn test_iteration() {
    let root = byte_list(vec![1, 2, 3]);
    let value = root.value().unwrap();
    let list = value.as_list().unwrap();
    let forward = list
        .iter()
        .map(|v| v.unwrap().as_u64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(forward, vec![1, 2, 3]);
    let backward = list
        .iter()
        .rev()
        .map(|v| v.unwrap().as_u64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(backward, vec![3, 2, 1]);
    assert_eq!(list.iter().len(), 3);
    assert_eq!(list.to_vec().unwrap().len(), 3);
}

#[test]
fn test_list_queries() {
    let root = byte_list(vec![1, 2, 2, 3]);
    let value = root.value().unwrap();
    let list = value.as_list().unwrap();
    assert!(list.contains(&Value::UInt(2)).unwrap());
    assert!(list.contains(&Value::Int(2)).unwrap());
    assert!(!list.contains(&Value::Float(2.0)).unwrap());
    assert_eq!(list.index_of(&Value::Int(2)).unwrap(), Some(1));
    assert_eq!(list.index_of(&Value::Int(9)).unwrap(), None);
    assert_eq!(list.count(&Value::UInt(2)).unwrap(), 2);
}

#[test]
fn test_lists_are_immutable() {
    let root = byte_list(vec![1]);
    let value = root.value().unwrap();
    let mut list = value.as_list().unwrap().clone();
    let failures = [
        list.append(Value::Int(1)).unwrap_err(),
        list.insert(0, Value::Int(1)).unwrap_err(),
        list.extend(vec![Value::Null]).unwrap_err(),
        list.set(0, Value::Int(1)).unwrap_err(),
        list.remove(&Value::Int(1)).unwrap_err(),
        list.pop().unwrap_err(),
        list.sort().unwrap_err(),
        list.reverse().unwrap_err(),
        list.clear().unwrap_err(),
    ];
    for err in failures {
        assert!(matches!(err.kind(), ErrorKind::ImmutableValue { .. }));
    }
    assert_eq!(list.len(), 1);
}

fn records() -> Root {
    let mut builder = SchemaBuilder::new();
    let one = builder.primitive(ElementType::Float64);
    let two = builder.primitive(ElementType::Float64);
    let record = builder
        .record(vec![("one".to_string(), one), ("two".to_string(), two)])
        .unwrap();
    let root = builder.list_offset(record);
    bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, 2])),
            ("object-Ld-R_one", Array::from_vec(vec![1.0f64, 2.71])),
            ("object-Ld-R_two", Array::from_vec(vec![3.14f64, 99.9])),
        ],
        ResolveOptions::lazy(),
    )
}

#[test]
fn test_record_access() {
    let root = records();
    let value = root.value().unwrap();
    let first = value.at(0).unwrap();
    let record = first.as_record().unwrap();
    assert_eq!(record.name(), "Record-0");
    assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["one", "two"]);
    assert_eq!(record.get("one").unwrap(), Value::Float(1.0));
    assert_eq!(value.at(1).unwrap().field("one").unwrap(), Value::Float(2.71));

    let err = record.get("three").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingField { field, .. } if field == "three"));
    assert_eq!(
        root.to_json().unwrap(),
        json!([[{"one": 1.0, "two": 3.14}, {"one": 2.71, "two": 99.9}]])
    );
}

#[test]
fn test_record_equality_and_order() {
    let root = records();
    let value = root.value().unwrap();
    let (first, second) = (value.at(0).unwrap(), value.at(1).unwrap());
    assert_eq!(first, value.at(0).unwrap());
    assert_ne!(first, second);
    assert!(first < second);
    assert_eq!(first.to_json().unwrap(), value.at(-2).unwrap().to_json().unwrap());
}

#[test]
fn test_dense_union() {
    let mut builder = SchemaBuilder::new();
    let byte = builder.primitive(ElementType::UInt8);
    let inner = builder.primitive(ElementType::UInt8);
    let list = builder.list_offset(inner);
    let union = builder.union_dense(vec![byte, list], BufferDescriptor::Default, false);
    let root = builder.list_offset(union);
    let root = bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, 3])),
            ("object-Ld-Ut", Array::from_vec(vec![0u8, 1, 0])),
            ("object-Ld-Ud0", Array::from_vec(vec![0u8, 255])),
            ("object-Ld-Ud1-Lo", offsets(&[0, 1])),
            ("object-Ld-Ud1-Ld", Array::from_vec(vec![0u8])),
        ],
        ResolveOptions::default(),
    );
    let value = root.value().unwrap();
    assert_eq!(value.at(0).unwrap(), Value::UInt(0));
    assert_eq!(value.at(1).unwrap().as_list().unwrap().len(), 1);
    assert_eq!(value.at(2).unwrap(), Value::UInt(255));
    assert_eq!(root.to_json().unwrap(), json!([[0, [0], 255]]));
}

#[test]
fn test_nullable_leaf() {
    let mut builder = SchemaBuilder::new();
    let leaf = builder.primitive_with(ElementType::UInt8, BufferDescriptor::Default, true);
    let root = builder.list_offset(leaf);
    let root = bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, 3])),
            ("object-Ld", Array::from_options(vec![Some(1u8), None, Some(3)])),
        ],
        ResolveOptions::default(),
    );
    let value = root.value().unwrap();
    assert!(value.at(1).unwrap().is_null());
    assert_eq!(value.at(2).unwrap(), Value::UInt(3));
    assert_eq!(root.to_json().unwrap(), json!([[1, null, 3]]));
}

#[test]
fn test_pointer_dereference() {
    let mut builder = SchemaBuilder::new();
    let v = builder.primitive(ElementType::UInt8);
    let next = builder.pointer_placeholder(BufferDescriptor::Default, true);
    let record = builder
        .record(vec![("v".to_string(), v), ("next".to_string(), next)])
        .unwrap();
    let root = builder.list_offset(record);
    builder.set_pointer_target(next, record).unwrap();
    let root = bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Lo", offsets(&[0, 3])),
            ("object-Ld-R_v", Array::from_vec(vec![10u8, 20, 30])),
            (
                "object-Ld-R_next-Px",
                Array::from_options(vec![Some(1u32), Some(2), None]),
            ),
        ],
        ResolveOptions::default(),
    );
    let value = root.value().unwrap();
    let head = value.at(0).unwrap();
    let second = head.field("next").unwrap();
    assert_eq!(second.field("v").unwrap(), Value::UInt(20));
    let third = second.field("next").unwrap();
    assert_eq!(third.field("v").unwrap(), Value::UInt(30));
    assert!(third.field("next").unwrap().is_null());
    assert_eq!(third, value.at(2).unwrap());
}

#[test]
fn test_tuple_access() {
    let mut builder = SchemaBuilder::new();
    let a = builder.primitive(ElementType::Int32);
    let b = builder.primitive(ElementType::Boolean);
    let root = builder.tuple(vec![a, b]);
    let root = bind(
        builder.finish(root).unwrap(),
        vec![
            ("object-Rn0", Array::from_vec(vec![-1i32, 2])),
            ("object-Rn1", Array::from_vec(vec![oamap_buffers::Logical::from(true), false.into()])),
        ],
        ResolveOptions::default(),
    );
    assert_eq!(root.len().unwrap(), 2);
    let first = root.get(0).unwrap();
    let tuple = first.as_tuple().unwrap();
    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple.get(0).unwrap(), Value::Int(-1));
    assert_eq!(tuple.get(1).unwrap(), Value::Bool(true));
    assert!(tuple.get(2).is_err());
    assert_eq!(root.to_json().unwrap(), json!([[-1, true], [2, false]]));
}

#[test]
fn test_value_order() {
    assert!(Value::Null < Value::Bool(false));
    assert!(Value::Bool(true) < Value::Int(-5));
    assert!(Value::Int(1) < Value::Float(1.0));
    assert!(Value::Float(0.5) < Value::UInt(1));
    assert_eq!(Value::Int(3), Value::UInt(3));
    assert_ne!(Value::Int(3), Value::Float(3.0));
    assert_eq!(Value::Float(f64::NAN), Value::Null);

    let short = byte_list(vec![1, 2]).value().unwrap();
    let long = byte_list(vec![1, 2, 0]).value().unwrap();
    let bigger = byte_list(vec![1, 3]).value().unwrap();
    assert!(short < long);
    assert!(long < bigger);
    assert!(Value::Float(1e9) < short);
}

#[test]
fn test_equality_matches_json() {
    let values = [
        byte_list(vec![1, 2]).value().unwrap(),
        byte_list(vec![1, 2]).value().unwrap(),
        byte_list(vec![2, 1]).value().unwrap(),
        records().value().unwrap().at(0).unwrap(),
        records().value().unwrap().at(1).unwrap(),
        Value::Int(1),
        Value::UInt(1),
        Value::Float(1.0),
        Value::Null,
        Value::Float(f64::INFINITY),
    ];
    for a in &values {
        for b in &values {
            assert_eq!(a == b, a.to_json().unwrap() == b.to_json().unwrap());
        }
    }
}

#[test]
fn test_root_requires_bound_schema() {
    let mut builder = SchemaBuilder::new();
    let root = builder.primitive(ElementType::Float64);
    let schema = builder.finish(root).unwrap();
    let err = Root::new(Arc::new(schema)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
}
