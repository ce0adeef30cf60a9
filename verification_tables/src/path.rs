use std::fmt::Display;

/// A fully-qualified field path, such as `consented_grp/section_b/verification_no`.
///
/// The platform writes paths as `/`-separated strings. Parsing splits on the
/// separator once; segments added afterwards with [`FieldPath::child`] (for
/// example the keys of a nested object) are kept whole, even if they contain
/// the separator.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub const SEPARATOR: char = '/';

    /// An empty string is the empty path.
    pub fn parse(s: &str) -> FieldPath {
        if s.is_empty() {
            return FieldPath::default();
        }
        FieldPath {
            segments: s.split(Self::SEPARATOR).map(|x| x.to_string()).collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> FieldPath
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            segments: segments.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub fn child(&self, segment: &str) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        FieldPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The short key of the field: the segment after the last separator.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join(&Self::SEPARATOR.to_string()))
    }
}
