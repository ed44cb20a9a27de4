//! Reversible naming of schema positions.
//!
//! A [`SchemaPath`] is a prefix followed by a sequence of [`PathSegment`]s. Its textual
//! form joins the prefix and segments with a single-character delimiter, e.g.
//! `object-Ld-R_x-Ud1`, and is used as the key of the node's buffers in a source.

use std::{fmt, str::FromStr};

use oamap_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

/// One step of a schema path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// `Lc`
    ListCount,
    /// `Lo`
    ListOffset,
    /// `Lb`
    ListBegin,
    /// `Le`
    ListEnd,
    /// `Ld`
    ListData,
    /// `R_<name>`. The name must not contain the delimiter of the path.
    RecordField(String),
    /// `Rn<k>`
    TupleIndex(usize),
    /// `Ut`
    UnionTag,
    /// `Uo`
    UnionOffset,
    /// `Ud<k>`
    UnionData(usize),
    /// `Px`
    PointerIndex,
    /// `Pt`: a pointer target that is not owned anywhere else in the tree.
    PointerTarget,
}

impl PathSegment {
    /// Returns `true` if the segment names a buffer of a node rather than a child node.
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            PathSegment::ListCount
                | PathSegment::ListOffset
                | PathSegment::ListBegin
                | PathSegment::ListEnd
                | PathSegment::UnionTag
                | PathSegment::UnionOffset
                | PathSegment::PointerIndex
        )
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::ListCount => f.write_str("Lc"),
            PathSegment::ListOffset => f.write_str("Lo"),
            PathSegment::ListBegin => f.write_str("Lb"),
            PathSegment::ListEnd => f.write_str("Le"),
            PathSegment::ListData => f.write_str("Ld"),
            PathSegment::RecordField(name) => write!(f, "R_{name}"),
            PathSegment::TupleIndex(index) => write!(f, "Rn{index}"),
            PathSegment::UnionTag => f.write_str("Ut"),
            PathSegment::UnionOffset => f.write_str("Uo"),
            PathSegment::UnionData(index) => write!(f, "Ud{index}"),
            PathSegment::PointerIndex => f.write_str("Px"),
            PathSegment::PointerTarget => f.write_str("Pt"),
        }
    }
}

impl FromStr for PathSegment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        fn ordinal(digits: &str, segment: &str) -> Result<usize> {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_format(
                    "path segment",
                    format!("'{segment}' has no ordinal"),
                ));
            }
            digits
                .parse()
                .map_err(|_| Error::invalid_format("path segment", format!("'{segment}'")))
        }

        let segment = match s {
            "Lc" => PathSegment::ListCount,
            "Lo" => PathSegment::ListOffset,
            "Lb" => PathSegment::ListBegin,
            "Le" => PathSegment::ListEnd,
            "Ld" => PathSegment::ListData,
            "Ut" => PathSegment::UnionTag,
            "Uo" => PathSegment::UnionOffset,
            "Px" => PathSegment::PointerIndex,
            "Pt" => PathSegment::PointerTarget,
            _ => {
                if let Some(name) = s.strip_prefix("R_") {
                    PathSegment::RecordField(name.to_string())
                } else if let Some(digits) = s.strip_prefix("Rn") {
                    PathSegment::TupleIndex(ordinal(digits, s)?)
                } else if let Some(digits) = s.strip_prefix("Ud") {
                    PathSegment::UnionData(ordinal(digits, s)?)
                } else {
                    return Err(Error::invalid_format(
                        "path segment",
                        format!("unknown segment '{s}'"),
                    ));
                }
            }
        };
        Ok(segment)
    }
}

/// The position of a node (or one of its buffers) relative to the schema root.
///
/// Paths compare lexicographically over prefix, segments and delimiter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaPath {
    prefix: String,
    segments: Vec<PathSegment>,
    delimiter: char,
}

impl SchemaPath {
    /// The root path: a prefix with no segments.
    pub fn new(prefix: impl Into<String>, delimiter: char) -> SchemaPath {
        SchemaPath {
            prefix: prefix.into(),
            segments: Vec::new(),
            delimiter,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, segment: PathSegment) -> SchemaPath {
        let mut path = self.clone();
        path.segments.push(segment);
        path
    }

    pub fn parent(&self) -> Option<SchemaPath> {
        let mut path = self.clone();
        path.segments.pop().map(|_| path)
    }

    /// The key of one of this node's buffers, or of the node itself for `None`.
    pub fn buffer_key(&self, segment: Option<&PathSegment>) -> String {
        match segment {
            Some(segment) => self.child(segment.clone()).format(),
            None => self.format(),
        }
    }

    pub fn format(&self) -> String {
        let mut s = self.prefix.clone();
        for segment in &self.segments {
            s.push(self.delimiter);
            s.push_str(&segment.to_string());
        }
        s
    }

    /// Parses the textual form of a path.
    ///
    /// The text must start with `prefix`, followed by either nothing or the delimiter.
    /// Empty segments between delimiters are discarded.
    pub fn parse(text: &str, prefix: &str, delimiter: char) -> Result<SchemaPath> {
        let rest = text.strip_prefix(prefix).ok_or_else(|| {
            Error::invalid_format("path", format!("'{text}' does not start with '{prefix}'"))
        })?;
        if !rest.is_empty() && !rest.starts_with(delimiter) {
            return Err(Error::invalid_format(
                "path",
                format!("'{text}' does not continue '{prefix}' with '{delimiter}'"),
            ));
        }
        let segments = rest
            .split(delimiter)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<PathSegment>>>()?;
        Ok(SchemaPath {
            prefix: prefix.to_string(),
            segments,
            delimiter,
        })
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// The prefix and delimiter under which buffer keys are formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathNaming {
    pub prefix: String,
    pub delimiter: char,
}

impl PathNaming {
    pub const DEFAULT_PREFIX: &'static str = "object";
    pub const DEFAULT_DELIMITER: char = '-';

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::invalid_arg("prefix", "must not be empty"));
        }
        if self.delimiter.is_alphanumeric() || self.delimiter == '_' {
            return Err(Error::invalid_arg(
                "delimiter",
                format!("'{}' may occur inside segments", self.delimiter),
            ));
        }
        Ok(())
    }

    pub fn root(&self) -> SchemaPath {
        SchemaPath::new(self.prefix.clone(), self.delimiter)
    }

    pub fn parse(&self, text: &str) -> Result<SchemaPath> {
        SchemaPath::parse(text, &self.prefix, self.delimiter)
    }
}

impl Default for PathNaming {
    fn default() -> Self {
        PathNaming {
            prefix: Self::DEFAULT_PREFIX.to_string(),
            delimiter: Self::DEFAULT_DELIMITER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PathNaming, PathSegment, SchemaPath};

    #[test]
    fn test_path_round_trip() {
        let naming = PathNaming::default();
        let path = naming
            .root()
            .child(PathSegment::ListData)
            .child(PathSegment::RecordField("x".into()))
            .child(PathSegment::UnionData(12))
            .child(PathSegment::TupleIndex(0))
            .child(PathSegment::PointerTarget);
        let text = path.format();
        assert_eq!(text, "object-Ld-R_x-Ud12-Rn0-Pt");
        assert_eq!(naming.parse(&text).unwrap(), path);
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        assert!(SchemaPath::parse("other-Ld", "object", '-').is_err());
        assert!(SchemaPath::parse("objects-Ld", "object", '-').is_err());
        assert!(SchemaPath::parse("object-Xy", "object", '-').is_err());
        assert!(SchemaPath::parse("object-Rn", "object", '-').is_err());
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let path = SchemaPath::parse("object--Ld---Lo", "object", '-').unwrap();
        assert_eq!(path.segments(), &[PathSegment::ListData, PathSegment::ListOffset]);
        assert!(SchemaPath::parse("object", "object", '-').unwrap().is_root());
    }

    #[test]
    fn test_custom_naming() {
        let naming = PathNaming::default().with_prefix("t").with_delimiter('.');
        naming.validate().unwrap();
        let key = naming.root().buffer_key(Some(&PathSegment::UnionTag));
        assert_eq!(key, "t.Ut");
        assert!(PathNaming::default().with_delimiter('x').validate().is_err());
        assert!(PathNaming::default().with_prefix("").validate().is_err());
    }

    #[test]
    fn test_field_names_with_delimiter() {
        let naming = PathNaming::default().with_delimiter('.');
        let path = naming
            .root()
            .child(PathSegment::RecordField("first-name".into()));
        assert_eq!(path.format(), "object.R_first-name");
        assert_eq!(naming.parse(&path.format()).unwrap(), path);

        let dashed = PathNaming::default()
            .root()
            .child(PathSegment::RecordField("first-name".into()));
        assert_ne!(PathNaming::default().parse(&dashed.format()).ok(), Some(dashed));
    }

    #[test]
    fn test_path_ordering() {
        let root = PathNaming::default().root();
        let a = root.child(PathSegment::RecordField("a".into()));
        let b = root.child(PathSegment::RecordField("b".into()));
        assert!(root < a);
        assert!(a < b);
        assert_eq!(a.parent(), Some(root));
    }
}
