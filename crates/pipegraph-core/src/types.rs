//! Type roles shared by every element of a graph

use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Bundles the five type roles a graph is parameterized over.
///
/// Every element kind (vertex, edge, multiedge, hyperedge) and the graph
/// itself use the same roles, so one implementation of this trait fixes the
/// whole data model.
pub trait GraphTypes: Debug + Clone + Send + Sync + 'static {
    /// Element identifier, unique per element kind within a graph
    type Id: Clone + Ord + Hash + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Optimistic-concurrency marker advanced on every property mutation
    type Revision: Clone + Ord + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Classifies an element within its kind
    type Label: Clone + Ord + Hash + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Property bag key
    type Key: PropertyKey;

    /// Property bag value
    type Value: Clone + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;
}

/// String ids and labels, `u64` revisions and dynamic [`Value`] properties
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypes;

impl GraphTypes for DefaultTypes {
    type Id = String;
    type Revision = u64;
    type Label = String;
    type Key = String;
    type Value = Value;
}

/// A property key.
///
/// Keys are validated before any mutation; an invalid key is rejected
/// with [`Error::InvalidArgument`](crate::Error::InvalidArgument).
pub trait PropertyKey:
    Clone + Eq + Hash + Ord + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn is_valid_key(&self) -> bool {
        true
    }
}

impl PropertyKey for String {
    fn is_valid_key(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl PropertyKey for u64 {}

impl PropertyKey for u32 {}

/// The four element kinds, plus the graph itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
    MultiEdge,
    HyperEdge,
    Graph,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Edge => "edge",
            Self::MultiEdge => "multiedge",
            Self::HyperEdge => "hyperedge",
            Self::Graph => "graph",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction for adjacency lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_keys_must_be_non_empty() {
        assert!("name".to_string().is_valid_key());
        assert!(!String::new().is_valid_key());
        assert!(!"   ".to_string().is_valid_key());
        assert!(7u64.is_valid_key());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ElementKind::MultiEdge.to_string(), "multiedge");
        assert_eq!(ElementKind::Vertex.as_str(), "vertex");
    }
}
