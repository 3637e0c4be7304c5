//! Shared primitives for the element-location core.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreTypeError {
    #[error("malformed index path '{0}'")]
    MalformedIndexPath(String),
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of the application under test (bundle id or equivalent).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AppId(pub String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque capability token handed out by the element cache.
///
/// Keys are never validated by shape; an unknown token is simply unknown.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub String);

impl ElementKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable accessibility reference of a live element.
///
/// Equal references denote the same live element for as long as the element
/// has not been replaced in the native hierarchy.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AxRef(pub String);

impl AxRef {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Display for AxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a node relative to the root of the snapshot that produced it.
///
/// The root itself has the empty path and renders as `/`; its second child's
/// first child renders as `/1/0`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_offsets(offsets: Vec<usize>) -> Self {
        Self(offsets)
    }

    pub fn child(&self, offset: usize) -> Self {
        let mut offsets = Vec::with_capacity(self.0.len() + 1);
        offsets.extend_from_slice(&self.0);
        offsets.push(offset);
        Self(offsets)
    }

    /// Parent path, recovered by prefix. `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn offsets(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_ancestor_of(&self, other: &IndexPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for offset in &self.0 {
            write!(f, "/{offset}")?;
        }
        Ok(())
    }
}

impl FromStr for IndexPath {
    type Err = CoreTypeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || CoreTypeError::MalformedIndexPath(raw.to_string());
        let rest = raw.strip_prefix('/').ok_or_else(malformed)?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        rest.split('/')
            .map(|part| part.parse::<usize>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Element bounding rectangle in screen points.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn index_path_display_and_parse() {
        let path = IndexPath::root().child(1).child(0);
        assert_eq!(path.to_string(), "/1/0");
        assert_eq!("/1/0".parse::<IndexPath>().unwrap(), path);
        assert_eq!("/".parse::<IndexPath>().unwrap(), IndexPath::root());
        assert_eq!(IndexPath::root().to_string(), "/");
    }

    #[test]
    fn index_path_rejects_garbage() {
        assert!("1/0".parse::<IndexPath>().is_err());
        assert!("/a/0".parse::<IndexPath>().is_err());
        assert!("/1//0".parse::<IndexPath>().is_err());
    }

    #[test]
    fn index_path_parent_is_prefix() {
        let path = IndexPath::from_offsets(vec![2, 3, 4]);
        assert_eq!(path.parent(), Some(IndexPath::from_offsets(vec![2, 3])));
        assert!(path.parent().unwrap().is_ancestor_of(&path));
        assert!(IndexPath::root().parent().is_none());
        assert!(!path.is_ancestor_of(&path));
    }

    #[test]
    fn element_keys_are_distinct() {
        let keys: HashSet<ElementKey> = (0..512).map(|_| ElementKey::generate()).collect();
        assert_eq!(keys.len(), 512);
    }
}
