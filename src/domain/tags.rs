//! Cache tags.
//!
//! A tag is an opaque label naming a slice of cached content that is
//! invalidated together. Tags for one change form a set.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Single cache tag such as `post`, `post-42`, `category-news` or `menu-3`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheTag(String);

impl CacheTag {
    /// Build a tag, returning `None` for empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() == value.len() {
            Some(Self(value))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Keep caller-supplied text byte-for-byte. Only the empty string is
    /// refused.
    pub fn verbatim(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    /// `{prefix}-{suffix}`, skipped when either half is empty.
    pub fn joined(prefix: &str, suffix: impl Display) -> Option<Self> {
        let suffix = suffix.to_string();
        if prefix.trim().is_empty() || suffix.trim().is_empty() {
            return None;
        }
        Self::new(format!("{}-{}", prefix.trim(), suffix.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered, de-duplicated collection of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<CacheTag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag. Returns false for duplicates.
    pub fn insert(&mut self, tag: CacheTag) -> bool {
        self.0.insert(tag)
    }

    /// Insert raw text, ignoring empty values.
    pub fn insert_str(&mut self, value: impl Into<String>) -> bool {
        match CacheTag::new(value) {
            Some(tag) => self.insert(tag),
            None => false,
        }
    }

    /// Insert caller-supplied text unchanged, ignoring only empty strings.
    pub fn insert_verbatim(&mut self, value: impl Into<String>) -> bool {
        match CacheTag::verbatim(value) {
            Some(tag) => self.insert(tag),
            None => false,
        }
    }

    pub fn insert_opt(&mut self, tag: Option<CacheTag>) -> bool {
        match tag {
            Some(tag) => self.insert(tag),
            None => false,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|tag| tag.as_str() == value)
    }

    pub fn merge(&mut self, other: TagSet) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheTag> {
        self.0.iter()
    }

    /// Tags as plain strings, in sorted order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|tag| tag.0.clone()).collect()
    }
}

/// Extending keeps values verbatim; see [`TagSet::insert_verbatim`].
impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for value in iter {
            self.insert_verbatim(value);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for TagSet {
    type Item = CacheTag;
    type IntoIter = std::collections::btree_set::IntoIter<CacheTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tags_are_rejected() {
        assert!(CacheTag::new("").is_none());
        assert!(CacheTag::new("   ").is_none());
        assert!(CacheTag::joined("", 42).is_none());
        assert!(CacheTag::joined("post", "").is_none());
    }

    #[test]
    fn joined_tag_formats_prefix_and_suffix() {
        let tag = CacheTag::joined("post", 42).expect("tag");
        assert_eq!(tag.as_str(), "post-42");
    }

    #[test]
    fn set_collapses_duplicates() {
        let mut set = TagSet::new();
        assert!(set.insert_str("post"));
        assert!(!set.insert_str("post"));
        set.extend(["post-1", "post-1", ""]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_strings(), vec!["post", "post-1"]);
    }

    #[test]
    fn extended_values_are_kept_verbatim() {
        let mut set = TagSet::new();
        set.extend([" Shop ", "  ", "post"]);

        assert_eq!(set.to_strings(), vec!["  ", " Shop ", "post"]);
        assert!(CacheTag::verbatim("").is_none());
    }

    #[test]
    fn serializes_as_plain_array() {
        let set: TagSet = ["menu", "menu-3"].into_iter().collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, r#"["menu","menu-3"]"#);
    }
}
