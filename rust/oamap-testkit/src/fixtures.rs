//! Hand-written inputs.

use oamap_schema::{HostObject, HostValue};

/// `[[3, 2, 1], [], [4, 5]]`
pub fn jagged() -> HostValue {
    HostValue::from(vec![vec![3i64, 2, 1], vec![], vec![4, 5]])
}

/// `[0, [0], 255]`
pub fn heterogeneous() -> HostValue {
    HostValue::List(vec![
        HostValue::Int(0),
        HostValue::from(vec![0i64]),
        HostValue::Int(255),
    ])
}

/// `[{"one": 1, "two": 3.14}, {"one": 2.71, "two": 99.9}]`
pub fn widening_records() -> HostValue {
    HostValue::List(vec![
        HostValue::mapping([("one", HostValue::Int(1)), ("two", HostValue::Float(3.14))]),
        HostValue::mapping([
            ("one", HostValue::Float(2.71)),
            ("two", HostValue::Float(99.9)),
        ]),
    ])
}

/// `[1, null, 3]`
pub fn nullable_leaf() -> HostValue {
    HostValue::from(vec![Some(1i64), None, Some(3)])
}

/// An object whose only attribute refers to itself.
pub fn self_referencing() -> HostValue {
    let object = HostObject::new("Node");
    object.set("next", HostValue::Object(object.clone()));
    HostValue::Object(object)
}
