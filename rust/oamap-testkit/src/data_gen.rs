//! Seeded generation of randomly shaped documents.
//!
//! Documents are drawn from a random [`Shape`]. Every position of a shape observes at
//! least one non-null value (lists are never empty and only the tail of a list may
//! hold nulls), and a leaf position never mixes integers with floats, so the JSON of
//! an ingested document reads back unchanged. Sparse records give values of one
//! position differing field sets, which ingest as separate record possibilities.

use oamap_common::Result;
use oamap_schema::HostValue;
use serde_json::{Map, Value};

/// The type a generated value conforms to.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Bool,
    /// Integers in `min..=max`.
    Int { min: i64, max: i64 },
    /// Numbers with a fractional part.
    Float,
    List(Box<Shape>),
    Record(Vec<(String, Shape)>),
    /// A record whose values each carry a random, non-empty subset of the fields.
    Sparse(Vec<(String, Shape)>),
    /// A value of either shape. The two sides never merge during inference.
    Either(Box<Shape>, Box<Shape>),
}

impl Shape {
    /// Draws a random shape nested at most `depth` levels.
    pub fn random(rng: &mut fastrand::Rng, depth: usize) -> Shape {
        let choice = if depth == 0 {
            rng.u8(0..3)
        } else {
            rng.u8(0..8)
        };
        match choice {
            0 => Shape::Bool,
            1 => {
                let min = if rng.bool() { 0 } else { -rng.i64(1..200) };
                Shape::Int {
                    min,
                    max: min + rng.i64(1..100_000),
                }
            }
            2 => Shape::Float,
            3 | 4 => Shape::List(Box::new(Shape::random(rng, depth - 1))),
            5 => {
                let count = rng.usize(1..4);
                Shape::Record(
                    (0..count)
                        .map(|i| (format!("f{i}"), Shape::random(rng, depth - 1)))
                        .collect(),
                )
            }
            6 => {
                let count = rng.usize(2..4);
                Shape::Sparse(
                    (0..count)
                        .map(|i| (format!("s{i}"), Shape::random(rng, depth - 1)))
                        .collect(),
                )
            }
            _ => Shape::Either(
                Box::new(Shape::random(rng, 0)),
                Box::new(Shape::List(Box::new(Shape::random(rng, depth - 1)))),
            ),
        }
    }

    /// Draws a value of this shape. `null_ratio` applies to list elements after
    /// the first one.
    pub fn generate(&self, rng: &mut fastrand::Rng, null_ratio: f64) -> Value {
        match self {
            Shape::Bool => Value::Bool(rng.bool()),
            Shape::Int { min, max } => Value::from(rng.i64(*min..=*max)),
            Shape::Float => Value::from(rng.i32(-10_000..10_000) as f64 + 0.25),
            Shape::List(element) => {
                let len = rng.usize(1..5);
                Value::Array(
                    (0..len)
                        .map(|i| {
                            if i > 0 && rng.f64() < null_ratio {
                                Value::Null
                            } else {
                                element.generate(rng, null_ratio)
                            }
                        })
                        .collect(),
                )
            }
            Shape::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, shape)| (name.clone(), shape.generate(rng, null_ratio)))
                    .collect::<Map<_, _>>(),
            ),
            Shape::Sparse(fields) => {
                let kept = rng.usize(..fields.len());
                Value::Object(
                    fields
                        .iter()
                        .enumerate()
                        .filter_map(|(i, (name, shape))| {
                            (i == kept || rng.bool())
                                .then(|| (name.clone(), shape.generate(rng, null_ratio)))
                        })
                        .collect::<Map<_, _>>(),
                )
            }
            Shape::Either(left, right) => {
                if rng.bool() {
                    left.generate(rng, null_ratio)
                } else {
                    right.generate(rng, null_ratio)
                }
            }
        }
    }
}

/// A seeded batch of `count` documents of a single random shape.
pub fn json_rows(seed: u64, count: usize) -> (Shape, Vec<Value>) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let shape = Shape::random(&mut rng, 3);
    let rows = (0..count.max(1))
        .map(|_| shape.generate(&mut rng, 0.2))
        .collect();
    (shape, rows)
}

/// Like [`json_rows`], converted to host values.
pub fn host_rows(seed: u64, count: usize) -> Result<(Vec<Value>, Vec<HostValue>)> {
    let (_, json) = json_rows(seed, count);
    let host = json
        .iter()
        .map(HostValue::from_json)
        .collect::<Result<Vec<_>>>()?;
    Ok((json, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_seeded() {
        assert_eq!(json_rows(7, 5), json_rows(7, 5));
    }

    #[test]
    fn test_sparse_records_are_never_empty() {
        let mut rng = fastrand::Rng::with_seed(3);
        let shape = Shape::Sparse(vec![
            ("s0".to_string(), Shape::Bool),
            ("s1".to_string(), Shape::Float),
            ("s2".to_string(), Shape::Bool),
        ]);
        let mut field_sets = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let Value::Object(map) = shape.generate(&mut rng, 0.0) else {
                panic!("not an object");
            };
            assert!(!map.is_empty());
            field_sets.insert(map.keys().cloned().collect::<Vec<_>>());
        }
        assert!(field_sets.len() > 1);
    }

    #[test]
    fn test_list_heads_are_never_null() {
        fn check(value: &Value) {
            match value {
                Value::Array(items) => {
                    assert!(!items.is_empty());
                    assert!(!items[0].is_null());
                    items.iter().for_each(check);
                }
                Value::Object(map) => map.values().for_each(check),
                _ => {}
            }
        }
        for seed in 0..50 {
            let (_, rows) = json_rows(seed, 4);
            rows.iter().for_each(check);
        }
    }
}
