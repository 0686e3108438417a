//! Hierarchical store paths
//!
//! Paths are `/`-joined segments: `{collection}/{partition}/.../{key}`.
//! The first segment names the collection and is used for metrics labels.

use crate::{StoreError, StoreResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// Path of a top-level collection
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parse a `/`-joined path; empty segments are rejected
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    /// Append one segment
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment
    pub fn key(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// First segment
    pub fn collection_name(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True when `self` equals `other` or lies beneath it
    pub fn starts_with(&self, other: &StorePath) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// True when `self` is exactly one level below `parent`
    pub fn is_child_of(&self, parent: &StorePath) -> bool {
        self.segments.len() == parent.segments.len() + 1 && self.starts_with(parent)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_display() {
        let path = StorePath::collection("feed").child("u1").child("p1");
        assert_eq!(path.to_string(), "feed/u1/p1");
        assert_eq!(path.key(), "p1");
        assert_eq!(path.collection_name(), "feed");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(StorePath::parse("").is_err());
        assert!(StorePath::parse("feed//p1").is_err());
        assert_eq!(
            StorePath::parse("/likes/a/b/").unwrap().to_string(),
            "likes/a/b"
        );
    }

    #[test]
    fn test_child_relationships() {
        let parent = StorePath::collection("followers").child("t");
        let child = parent.child("v");
        let grandchild = child.child("x");

        assert!(child.is_child_of(&parent));
        assert!(!grandchild.is_child_of(&parent));
        assert!(grandchild.starts_with(&parent));
        assert_eq!(child.parent(), Some(parent));
        assert_eq!(StorePath::collection("users").parent(), None);
    }
}
