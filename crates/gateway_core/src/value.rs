//! State tree values and dotted paths
//!
//! The application state is a dynamic tree: a [`StateValue::Map`] whose
//! values may themselves be maps, arbitrarily deep. Locations in the tree are
//! addressed by a [`StatePath`], parsed from a dot-separated string such as
//! `"user.position.x"`.
//!
//! Paths are validated once at the access boundary. An empty path or an
//! empty segment (`"user..x"`) is rejected with [`StateError::InvalidPath`]
//! instead of silently resolving to a missing value.

use crate::error::{Result, StateError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Ordered mapping used for every branch of the state tree
pub type StateMap = IndexMap<String, StateValue>;

/// A node in the state tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<StateValue>),
    Map(StateMap),
}

impl StateValue {
    /// An empty mapping
    pub fn map() -> Self {
        StateValue::Map(StateMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            StateValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut StateMap> {
        match self {
            StateValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Whether every number in this value, including nested ones, is finite
    ///
    /// NaN and infinities have no JSON form and would persist as `null`.
    pub fn is_finite(&self) -> bool {
        match self {
            StateValue::Number(n) => n.is_finite(),
            StateValue::List(items) => items.iter().all(StateValue::is_finite),
            StateValue::Map(map) => map.values().all(StateValue::is_finite),
            _ => true,
        }
    }

    /// Look up a nested location, returning `None` as soon as a segment is
    /// missing or the current node is not a map
    pub fn lookup(&self, path: &StatePath) -> Option<&StateValue> {
        let mut current = self;
        for segment in path.segments() {
            current = current.as_map()?.get(segment.as_str())?;
        }
        Some(current)
    }

    /// Build a map value from `(key, value)` pairs, keeping their order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<StateValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        StateValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Number(value)
    }
}

impl From<f32> for StateValue {
    fn from(value: f32) -> Self {
        StateValue::Number(value as f64)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        StateValue::Number(value as f64)
    }
}

impl From<u32> for StateValue {
    fn from(value: u32) -> Self {
        StateValue::Number(value as f64)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::String(value)
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(value: Vec<StateValue>) -> Self {
        StateValue::List(value)
    }
}

impl From<StateMap> for StateValue {
    fn from(value: StateMap) -> Self {
        StateValue::Map(value)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(StateValue::Null)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// A validated, dot-separated location in the state tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: SmallVec<[String; 4]>,
}

impl StatePath {
    /// Parse a dotted path, rejecting empty paths and empty segments
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(StateError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".to_string(),
            });
        }

        let mut segments = SmallVec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(StateError::InvalidPath {
                    path: raw.to_string(),
                    reason: "path contains an empty segment".to_string(),
                });
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment (the top-level branch)
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The last segment (the key written on `set`)
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// All segments except the leaf
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for StatePath {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        StatePath::parse(s)
    }
}

/// The tree a freshly constructed or reset store starts from
pub fn default_tree() -> StateValue {
    let xyz = || StateValue::from_pairs([("x", 0), ("y", 0), ("z", 0)]);

    StateValue::from_pairs([
        (
            "user",
            StateValue::from_pairs([
                ("id", StateValue::Null),
                ("name", "Anonymous".into()),
                ("position", xyz()),
                ("rotation", xyz()),
                ("vrMode", false.into()),
                ("deviceType", "desktop".into()),
                (
                    "preferences",
                    StateValue::from_pairs([
                        ("audioVolume", StateValue::from(0.7)),
                        ("graphicsQuality", "medium".into()),
                        ("locomotionType", "teleport".into()),
                    ]),
                ),
            ]),
        ),
        (
            "scene",
            StateValue::from_pairs([
                ("currentLevel", StateValue::Null),
                ("currentCategory", StateValue::Null),
                ("entities", StateValue::List(Vec::new())),
                ("interactions", StateValue::List(Vec::new())),
                (
                    "environment",
                    StateValue::from_pairs([
                        ("lighting", StateValue::from("day")),
                        ("weather", "clear".into()),
                        ("timeOfDay", 12.into()),
                    ]),
                ),
            ]),
        ),
        (
            "app",
            StateValue::from_pairs([
                ("isLoading", StateValue::from(false)),
                ("currentView", "main".into()),
                ("notifications", StateValue::List(Vec::new())),
                ("errors", StateValue::List(Vec::new())),
                (
                    "performance",
                    StateValue::from_pairs([("fps", 0), ("drawCalls", 0), ("memoryUsage", 0)]),
                ),
            ]),
        ),
        (
            "data",
            StateValue::from_pairs([
                ("currentDataset", StateValue::Null),
                ("loadedData", StateValue::map()),
                ("filters", StateValue::map()),
                ("visualizations", StateValue::map()),
            ]),
        ),
        (
            "ui",
            StateValue::from_pairs([
                ("overlays", StateValue::map()),
                ("modals", StateValue::map()),
                ("tooltips", StateValue::map()),
                ("menus", StateValue::map()),
            ]),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse() {
        let path = StatePath::parse("user.position.x").unwrap();
        assert_eq!(path.segments(), &["user", "position", "x"]);
        assert_eq!(path.root(), "user");
        assert_eq!(path.leaf(), "x");
        assert_eq!(path.parents(), &["user", "position"]);
    }

    #[test]
    fn test_path_rejects_empty_segments() {
        assert!(StatePath::parse("").is_err());
        assert!(StatePath::parse("user..x").is_err());
        assert!(StatePath::parse(".user").is_err());
        assert!(StatePath::parse("user.").is_err());
    }

    #[test]
    fn test_lookup_stops_at_non_map() {
        let tree = default_tree();
        let name = StatePath::parse("user.name").unwrap();
        assert_eq!(tree.lookup(&name), Some(&StateValue::from("Anonymous")));

        // "name" is a string, so descending further is absent rather than an error
        let below = StatePath::parse("user.name.first").unwrap();
        assert_eq!(tree.lookup(&below), None);

        let missing = StatePath::parse("user.nickname").unwrap();
        assert_eq!(tree.lookup(&missing), None);
    }

    #[test]
    fn test_is_finite_checks_nested_numbers() {
        assert!(StateValue::from(1.5).is_finite());
        assert!(StateValue::from("nan").is_finite());
        assert!(!StateValue::from(f64::NAN).is_finite());

        let nested = StateValue::from_pairs([(
            "pose",
            StateValue::List(vec![0.0.into(), f64::INFINITY.into()]),
        )]);
        assert!(!nested.is_finite());
    }

    #[test]
    fn test_json_untagged_shape() {
        let value = StateValue::from_pairs([
            ("a", StateValue::from(1)),
            ("b", StateValue::List(vec![true.into(), StateValue::Null])),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"a":1.0,"b":[true,null]}"#);

        let parsed: StateValue = serde_json::from_str(r#"{"a":1,"b":[true,null]}"#).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_default_tree_branches() {
        let tree = default_tree();
        let keys: Vec<&str> = tree.as_map().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["user", "scene", "app", "data", "ui"]);
    }
}
