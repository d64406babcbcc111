//! Identity types for Reel
//!
//! Subject identities come straight from acquisition (a 64-bit tracking id)
//! and stay stable for as long as the subject is visible.

use std::fmt;

/// Tracked subject identity
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SubjectId(pub u64);

impl SubjectId {
    pub const ZERO: SubjectId = SubjectId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        SubjectId(id)
    }

    /// Short numeral shown to the operator. Derived only from the identity,
    /// so the same subject keeps its label across frames.
    #[inline]
    pub fn short(self) -> u64 {
        self.0 % 1000
    }

    /// Display label, e.g. "Body 7"
    pub fn label(self) -> String {
        format!("Body {}", self.short())
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snippet identity - monotonically assigned per recorder
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnippetId(pub u64);

impl SnippetId {
    #[inline]
    pub fn new(id: u64) -> Self {
        SnippetId(id)
    }

    #[inline]
    pub fn next(self) -> Self {
        SnippetId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snippet(#{})", self.0)
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_label() {
        assert_eq!(SubjectId::new(7).label(), "Body 7");
        assert_eq!(SubjectId::new(72_057_594_037_928_123).label(), "Body 123");
    }

    #[test]
    fn test_label_is_deterministic() {
        let id = SubjectId::new(0xDEAD_BEEF);
        assert_eq!(id.label(), id.label());
        assert_eq!(id.short(), 0xDEAD_BEEF % 1000);
    }

    #[test]
    fn test_snippet_id_next() {
        let id = SnippetId::new(1);
        assert_eq!(id.next(), SnippetId::new(2));
        assert_eq!(format!("{}", id), "#1");
    }
}
