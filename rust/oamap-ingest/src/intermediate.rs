//! The intermediate type lattice built during inference.

use oamap_schema::RuntimeTag;

/// The inferred type of every host value observed at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct Intermediate {
    pub kind: IntermediateKind,
    /// Number of observed values, nulls included.
    pub size: usize,
    /// Whether at least one observed value was null.
    pub missing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntermediateKind {
    /// Nothing but nulls (or nothing at all) observed.
    Unknown,
    Boolean,
    Number(NumberRange),
    List(Box<Intermediate>),
    /// Fields sorted by name.
    Record {
        fields: Vec<(String, Intermediate)>,
        runtime: Option<RuntimeTag>,
    },
    Tuple {
        items: Vec<Intermediate>,
        runtime: Option<RuntimeTag>,
    },
    /// Mutually unmergeable alternatives. Nulls are tracked by the union's own
    /// `missing` flag, never by an alternative.
    Union(Vec<Intermediate>),
}

/// Summary of observed numbers.
///
/// `min` and `max` bound the observed values; non-integers contribute their floor
/// and ceiling. `whole` holds while only integers were observed and `real` while no
/// complex number was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    pub min: i128,
    pub max: i128,
    pub whole: bool,
    pub real: bool,
}

impl NumberRange {
    pub fn integer(value: i128) -> NumberRange {
        NumberRange {
            min: value,
            max: value,
            whole: true,
            real: true,
        }
    }

    /// A floating-point observation; never whole, even when integral.
    pub fn float(value: f64) -> NumberRange {
        NumberRange {
            min: value.floor() as i128,
            max: value.ceil() as i128,
            whole: false,
            real: true,
        }
    }

    pub fn complex(re: f64) -> NumberRange {
        NumberRange {
            real: false,
            ..NumberRange::float(re)
        }
    }

    pub fn merge(&self, other: &NumberRange) -> NumberRange {
        NumberRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            whole: self.whole && other.whole,
            real: self.real && other.real,
        }
    }
}

impl Intermediate {
    /// The type of no observations at all, e.g. the elements of an empty list.
    pub fn empty() -> Intermediate {
        Intermediate {
            kind: IntermediateKind::Unknown,
            size: 0,
            missing: false,
        }
    }

    /// A single null observation.
    pub fn null() -> Intermediate {
        Intermediate {
            kind: IntermediateKind::Unknown,
            size: 1,
            missing: true,
        }
    }

    /// A single non-null observation.
    pub fn of(kind: IntermediateKind) -> Intermediate {
        Intermediate {
            kind,
            size: 1,
            missing: false,
        }
    }

    pub fn with_missing(mut self, missing: bool) -> Intermediate {
        self.missing = missing;
        self
    }

    fn with_size(mut self, size: usize) -> Intermediate {
        self.size = size;
        self
    }

    /// Returns `true` if `unify(self, other)` merges instead of forming a union.
    pub fn is_mergeable(&self, other: &Intermediate) -> bool {
        use IntermediateKind::*;
        match (&self.kind, &other.kind) {
            (Unknown, _) | (_, Unknown) => true,
            (Boolean, Boolean) | (Number(_), Number(_)) | (List(_), List(_)) => true,
            (Record { fields: a, .. }, Record { fields: b, .. }) => same_names(a, b),
            (Tuple { items: a, .. }, Tuple { items: b, .. }) => a.len() == b.len(),
            _ => false,
        }
    }
}

/// The least type admitting everything `a` and `b` admit.
///
/// Compatible kinds merge pointwise; everything else becomes a union, into which
/// further types are merged alternative by alternative.
pub fn unify(a: Intermediate, b: Intermediate) -> Intermediate {
    use IntermediateKind::*;
    let size = a.size + b.size;
    let missing = a.missing || b.missing;
    let kind = match (a.kind, b.kind) {
        (Unknown, kind) | (kind, Unknown) => kind,
        (Boolean, Boolean) => Boolean,
        (Number(x), Number(y)) => Number(x.merge(&y)),
        (List(x), List(y)) => List(Box::new(unify(*x, *y))),
        (
            Record {
                fields: x,
                runtime: rx,
            },
            Record {
                fields: y,
                runtime: ry,
            },
        ) if same_names(&x, &y) => Record {
            fields: x
                .into_iter()
                .zip(y)
                .map(|((name, x), (_, y))| (name, unify(x, y)))
                .collect(),
            runtime: if rx == ry { rx } else { None },
        },
        (
            Tuple {
                items: x,
                runtime: rx,
            },
            Tuple {
                items: y,
                runtime: ry,
            },
        ) if x.len() == y.len() => Tuple {
            items: x.into_iter().zip(y).map(|(x, y)| unify(x, y)).collect(),
            runtime: if rx == ry { rx } else { None },
        },
        (x, y) => {
            let mut alternatives = Vec::new();
            absorb(&mut alternatives, Intermediate::of(x).with_size(a.size));
            absorb(&mut alternatives, Intermediate::of(y).with_size(b.size));
            Union(alternatives)
        }
    };
    Intermediate {
        kind,
        size,
        missing,
    }
}

/// Adds `item` to a union's alternatives, merging it into the first compatible one.
fn absorb(alternatives: &mut Vec<Intermediate>, item: Intermediate) {
    match item.kind {
        IntermediateKind::Union(inner) => {
            for alternative in inner {
                absorb(alternatives, alternative);
            }
        }
        IntermediateKind::Unknown => {}
        kind => {
            let item = Intermediate::of(kind).with_size(item.size);
            match alternatives.iter().position(|alt| alt.is_mergeable(&item)) {
                Some(i) => {
                    let existing = std::mem::replace(&mut alternatives[i], Intermediate::empty());
                    alternatives[i] = unify(existing, item);
                }
                None => alternatives.push(item),
            }
        }
    }
}

fn same_names(a: &[(String, Intermediate)], b: &[(String, Intermediate)]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|((x, _), (y, _))| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(min: i128, max: i128) -> Intermediate {
        Intermediate::of(IntermediateKind::Number(NumberRange {
            min,
            max,
            whole: true,
            real: true,
        }))
    }

    #[test]
    fn test_unify_numbers() {
        let float = Intermediate::of(IntermediateKind::Number(NumberRange::float(-2.5)));
        let merged = unify(number(1, 3), float);
        let IntermediateKind::Number(range) = merged.kind else {
            panic!("not a number");
        };
        assert_eq!((range.min, range.max), (-3, 3));
        assert!(!range.whole);
        assert!(range.real);
        assert_eq!(merged.size, 2);
    }

    #[test]
    fn test_unknown_is_identity() {
        let merged = unify(Intermediate::null(), number(1, 1));
        assert_eq!(merged.kind, number(1, 1).kind);
        assert!(merged.missing);
        assert_eq!(merged.size, 2);
    }

    #[test]
    fn test_union_absorbs_compatible_atoms() {
        let list = Intermediate::of(IntermediateKind::List(Box::new(number(0, 0))));
        let union = unify(number(0, 0), list);
        let union = unify(union, number(255, 255));
        let union = unify(union, Intermediate::null());
        let IntermediateKind::Union(alternatives) = &union.kind else {
            panic!("not a union");
        };
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].kind, number(0, 255).kind);
        assert_eq!(alternatives[0].size, 2);
        assert!(alternatives.iter().all(|alt| !alt.missing));
        assert!(union.missing);
        assert_eq!(union.size, 4);
    }

    #[test]
    fn test_records_merge_by_name_set() {
        let record = |names: &[&str]| {
            Intermediate::of(IntermediateKind::Record {
                fields: names
                    .iter()
                    .map(|name| (name.to_string(), number(1, 1)))
                    .collect(),
                runtime: None,
            })
        };
        let merged = unify(record(&["a", "b"]), record(&["a", "b"]));
        assert!(matches!(merged.kind, IntermediateKind::Record { .. }));
        let split = unify(record(&["a"]), record(&["a", "b"]));
        assert!(matches!(split.kind, IntermediateKind::Union(ref alts) if alts.len() == 2));
    }
}
