use ahash::AHashSet;
use oamap_common::{Result, error::Error};
use oamap_schema::{HostValue, RuntimeTag};

use crate::intermediate::{Intermediate, IntermediateKind, NumberRange, unify};

/// Infers the intermediate type of a single host value.
///
/// # Errors
///
/// Fails with `CyclicInput` if an object is reachable from itself.
pub fn infer(value: &HostValue) -> Result<Intermediate> {
    Inferencer::default().visit(value)
}

/// Infers the type admitting every one of `rows`.
pub fn infer_rows<'a>(rows: impl IntoIterator<Item = &'a HostValue>) -> Result<Intermediate> {
    let mut inferencer = Inferencer::default();
    let mut merged = Intermediate::empty();
    for row in rows {
        merged = unify(merged, inferencer.visit(row)?);
    }
    Ok(merged)
}

#[derive(Default)]
struct Inferencer {
    /// Identities of the objects currently being visited.
    in_flight: AHashSet<usize>,
}

impl Inferencer {
    fn visit(&mut self, value: &HostValue) -> Result<Intermediate> {
        let kind = match value {
            HostValue::Null => return Ok(Intermediate::null()),
            HostValue::Bool(_) => IntermediateKind::Boolean,
            HostValue::Int(v) => IntermediateKind::Number(NumberRange::integer(*v)),
            HostValue::Float(v) => IntermediateKind::Number(NumberRange::float(*v)),
            HostValue::Complex(v) => IntermediateKind::Number(NumberRange::complex(v.re)),
            HostValue::List(items) => {
                let mut element = Intermediate::empty();
                for item in items {
                    element = unify(element, self.visit(item)?);
                }
                IntermediateKind::List(Box::new(element))
            }
            HostValue::Tuple(items) => IntermediateKind::Tuple {
                items: items
                    .iter()
                    .map(|item| self.visit(item))
                    .collect::<Result<Vec<_>>>()?,
                runtime: None,
            },
            HostValue::Mapping(_) | HostValue::NamedTuple { .. } | HostValue::Object(_) => {
                self.record(value)?
            }
        };
        Ok(Intermediate::of(kind))
    }

    fn record(&mut self, value: &HostValue) -> Result<IntermediateKind> {
        let runtime = match value {
            HostValue::NamedTuple { name, fields, .. } => Some(RuntimeTag {
                name: name.clone(),
                args: fields.clone(),
            }),
            HostValue::Object(object) => Some(RuntimeTag::new(object.class_name())),
            _ => None,
        };
        let identity = match value {
            HostValue::Object(object) => {
                if !self.in_flight.insert(object.id()) {
                    return Err(Error::cyclic_input(format!(
                        "{object:?} is reachable from itself"
                    )));
                }
                Some(object.id())
            }
            _ => None,
        };

        let fields = value
            .with_fields(|fields| {
                fields
                    .iter()
                    .map(|(name, v)| Ok((name.to_string(), self.visit(v)?)))
                    .collect::<Result<Vec<_>>>()
            })
            .unwrap_or_else(|| Ok(Vec::new()));
        if let Some(identity) = identity {
            self.in_flight.remove(&identity);
        }
        let mut fields = fields?;
        fields.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(IntermediateKind::Record { fields, runtime })
    }
}
