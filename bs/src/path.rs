//! Hierarchical store paths
//!
//! A `StorePath` is a sequence of non-empty segments, written `a/b/c`.
//! The empty path is the tree root.

use std::fmt;
use std::str::FromStr;

use crate::messages::StoreError;

/// A path into the store tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// The tree root (empty path)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a `/`-separated path string
    ///
    /// Leading and trailing slashes are tolerated; empty interior segments
    /// are rejected.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::InvalidPath(s.to_string()));
        }
        Ok(Self(segments))
    }

    /// Append a single segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The path segments, root-first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this path is the tree root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this path is `other` or an ancestor of it
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// Whether a mutation at `self` is visible to a subscription at `other`
    /// (either path is a prefix of the other)
    pub fn intersects(&self, other: &StorePath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
