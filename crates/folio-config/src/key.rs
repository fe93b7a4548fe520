//! Dotted configuration keys
//!
//! A `Key` addresses a position in a configuration object tree. Keys parse
//! from dotted strings (`"a.b.c"`) and print the same way; the empty key
//! addresses the root object.

use std::fmt;

/// A configuration key, an ordered sequence of path segments.
///
/// Parsing splits naively on `.` - a literal dot inside a segment cannot be
/// escaped. This mirrors the key syntax accepted in markup and templates,
/// where keys are plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// The root key, addressing the top-level object itself.
    pub fn root() -> Self {
        Key {
            segments: Vec::new(),
        }
    }

    /// Parse a dotted key string. The empty string yields the root key.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Key::root();
        }
        Key {
            segments: s.split('.').map(|seg| seg.to_string()).collect(),
        }
    }

    /// Build a key from pre-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Key {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The path segments of this key.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check whether this is the root key.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Create a child key by appending one segment.
    pub fn child(&self, segment: impl Into<String>) -> Key {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Key { segments }
    }

    /// Create a child key by appending all segments of another key.
    pub fn child_key(&self, other: &Key) -> Key {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Key { segments }
    }

    /// The parent of this key. The root key is its own parent.
    pub fn parent(&self) -> Key {
        if self.segments.is_empty() {
            return Key::root();
        }
        Key {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// The last segment as a singleton key. The root key has no local part
    /// and returns itself.
    pub fn local(&self) -> Key {
        match self.segments.last() {
            Some(seg) => Key {
                segments: vec![seg.clone()],
            },
            None => Key::root(),
        }
    }

    /// The last segment, if any.
    pub fn local_name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Check whether this key is a strict descendant of `other`.
    pub fn is_child_of(&self, other: &Key) -> bool {
        self.segments.len() > other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::parse(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::parse(&s)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_dotted_key() {
        let key = Key::parse("a.b.c");
        assert_eq!(key.segments(), &["a", "b", "c"]);
    }

    #[test]
    fn test_parse_empty_is_root() {
        let key = Key::parse("");
        assert_eq!(key, Key::root());
        assert!(key.is_root());
        assert_eq!(key.segments().len(), 0);
    }

    #[test]
    fn test_no_dot_escaping() {
        // A literal dot always splits - there is no escape syntax.
        let key = Key::parse("a.b\\.c");
        assert_eq!(key.segments(), &["a", "b\\", "c"]);
    }

    #[test]
    fn test_child_and_parent() {
        let key = Key::parse("a.b");
        assert_eq!(key.child("c"), Key::parse("a.b.c"));
        assert_eq!(key.parent(), Key::parse("a"));
        assert_eq!(Key::parse("a").parent(), Key::root());
        assert_eq!(Key::root().parent(), Key::root());
    }

    #[test]
    fn test_child_key_appends_all_segments() {
        let key = Key::parse("a").child_key(&Key::parse("b.c"));
        assert_eq!(key, Key::parse("a.b.c"));
    }

    #[test]
    fn test_local() {
        assert_eq!(Key::parse("a.b.c").local(), Key::parse("c"));
        assert_eq!(Key::root().local(), Key::root());
        assert_eq!(Key::parse("a.b").local_name(), Some("b"));
    }

    #[test]
    fn test_is_child_of() {
        let parent = Key::parse("a.b");
        assert!(Key::parse("a.b.c").is_child_of(&parent));
        assert!(Key::parse("a.b.c.d").is_child_of(&parent));
        assert!(!parent.is_child_of(&parent));
        assert!(!Key::parse("a.c").is_child_of(&parent));
        assert!(Key::parse("a").is_child_of(&Key::root()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::parse("a.b.c").to_string(), "a.b.c");
        assert_eq!(Key::root().to_string(), "<root>");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Key::parse("a.b"), Key::from_segments(["a", "b"]));
    }
}
