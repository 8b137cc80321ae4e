//! Graph elements: vertices, edges, multiedges and hyperedges
//!
//! All four kinds share one [`Element`] representation. Kind-specific
//! endpoint data lives in [`Endpoints`], and adjacency is stored as id sets
//! resolved through the owning graph, never as references.

use crate::config::KeyNames;
use crate::properties::PropertyBag;
use crate::types::{ElementKind, GraphTypes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Incidence sets held by a vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "Id: Ord + Serialize + serde::de::DeserializeOwned")]
pub struct Adjacency<Id> {
    /// Edges leaving this vertex
    pub out_edges: BTreeSet<Id>,
    /// Edges arriving at this vertex
    pub in_edges: BTreeSet<Id>,
    /// Multiedges whose out-vertex is this vertex
    pub out_multi_edges: BTreeSet<Id>,
    /// Multiedges listing this vertex among their in-vertices
    pub in_multi_edges: BTreeSet<Id>,
    /// Hyperedges containing this vertex
    pub hyper_edges: BTreeSet<Id>,
}

impl<Id> Default for Adjacency<Id> {
    fn default() -> Self {
        Self {
            out_edges: BTreeSet::new(),
            in_edges: BTreeSet::new(),
            out_multi_edges: BTreeSet::new(),
            in_multi_edges: BTreeSet::new(),
            hyper_edges: BTreeSet::new(),
        }
    }
}

impl<Id> Adjacency<Id> {
    /// Number of incident elements of every kind
    pub fn degree(&self) -> usize {
        self.out_edges.len()
            + self.in_edges.len()
            + self.out_multi_edges.len()
            + self.in_multi_edges.len()
            + self.hyper_edges.len()
    }
}

/// Kind-specific endpoint data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
#[serde(bound = "Id: Ord + Serialize + serde::de::DeserializeOwned")]
pub enum Endpoints<Id> {
    Vertex(Adjacency<Id>),
    Edge {
        out_vertex: Id,
        in_vertex: Id,
    },
    #[serde(rename = "multiedge")]
    MultiEdge {
        out_vertex: Id,
        in_vertices: BTreeSet<Id>,
    },
    #[serde(rename = "hyperedge")]
    HyperEdge {
        vertices: BTreeSet<Id>,
    },
    Graph,
}

impl<Id> Endpoints<Id> {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Vertex(_) => ElementKind::Vertex,
            Self::Edge { .. } => ElementKind::Edge,
            Self::MultiEdge { .. } => ElementKind::MultiEdge,
            Self::HyperEdge { .. } => ElementKind::HyperEdge,
            Self::Graph => ElementKind::Graph,
        }
    }
}

/// An identified, labeled, revisioned element with a property bag.
///
/// Equality and hashing use the id and kind only; property contents and
/// revisions are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Element<T: GraphTypes> {
    id: T::Id,
    revision: T::Revision,
    label: T::Label,
    properties: PropertyBag<T::Key, T::Value>,
    endpoints: Endpoints<T::Id>,
    /// Insertion sequence number assigned by the owning store; a re-added
    /// element with a recycled id gets a new one
    #[serde(skip)]
    epoch: u64,
}

/// A vertex; `endpoints` is always [`Endpoints::Vertex`]
pub type Vertex<T> = Element<T>;
/// A directed edge between two vertices
pub type Edge<T> = Element<T>;
/// One out-vertex connected to a set of in-vertices
pub type MultiEdge<T> = Element<T>;
/// An edge over a set of at least two vertices
pub type HyperEdge<T> = Element<T>;

impl<T: GraphTypes> Element<T> {
    pub(crate) fn new(
        id: T::Id,
        revision: T::Revision,
        label: T::Label,
        properties: PropertyBag<T::Key, T::Value>,
        endpoints: Endpoints<T::Id>,
    ) -> Self {
        Self {
            id,
            revision,
            label,
            properties,
            endpoints,
            epoch: 0,
        }
    }

    pub fn id(&self) -> &T::Id {
        &self.id
    }

    pub fn revision(&self) -> &T::Revision {
        &self.revision
    }

    pub fn label(&self) -> &T::Label {
        &self.label
    }

    pub fn kind(&self) -> ElementKind {
        self.endpoints.kind()
    }

    pub fn endpoints(&self) -> &Endpoints<T::Id> {
        &self.endpoints
    }

    pub fn properties(&self) -> &PropertyBag<T::Key, T::Value> {
        &self.properties
    }

    /// Shorthand for `properties().get(key)`
    pub fn property(&self, key: &T::Key) -> Option<&T::Value> {
        self.properties.get(key)
    }

    /// Address of this element inside its graph
    pub fn reference(&self) -> ElementRef<T::Id> {
        ElementRef::new(self.kind(), self.id.clone())
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self.endpoints, Endpoints::Vertex(_))
    }

    /// Incidence sets, for vertices only
    pub fn adjacency(&self) -> Option<&Adjacency<T::Id>> {
        match &self.endpoints {
            Endpoints::Vertex(adjacency) => Some(adjacency),
            _ => None,
        }
    }

    /// Ids of edges leaving this vertex; empty for other kinds
    pub fn out_edges(&self) -> impl Iterator<Item = &T::Id> {
        self.adjacency().into_iter().flat_map(|a| a.out_edges.iter())
    }

    /// Ids of edges arriving at this vertex; empty for other kinds
    pub fn in_edges(&self) -> impl Iterator<Item = &T::Id> {
        self.adjacency().into_iter().flat_map(|a| a.in_edges.iter())
    }

    /// Tail vertex of an edge or multiedge
    pub fn out_vertex(&self) -> Option<&T::Id> {
        match &self.endpoints {
            Endpoints::Edge { out_vertex, .. } | Endpoints::MultiEdge { out_vertex, .. } => {
                Some(out_vertex)
            }
            _ => None,
        }
    }

    /// Head vertex of an edge
    pub fn in_vertex(&self) -> Option<&T::Id> {
        match &self.endpoints {
            Endpoints::Edge { in_vertex, .. } => Some(in_vertex),
            _ => None,
        }
    }

    /// Head vertices of a multiedge
    pub fn in_vertices(&self) -> Option<&BTreeSet<T::Id>> {
        match &self.endpoints {
            Endpoints::MultiEdge { in_vertices, .. } => Some(in_vertices),
            _ => None,
        }
    }

    /// Member vertices of a hyperedge
    pub fn vertices(&self) -> Option<&BTreeSet<T::Id>> {
        match &self.endpoints {
            Endpoints::HyperEdge { vertices } => Some(vertices),
            _ => None,
        }
    }

    /// Every vertex id this element touches, in a stable order
    pub fn incident_vertices(&self) -> Vec<&T::Id> {
        match &self.endpoints {
            Endpoints::Edge {
                out_vertex,
                in_vertex,
            } => vec![out_vertex, in_vertex],
            Endpoints::MultiEdge {
                out_vertex,
                in_vertices,
            } => std::iter::once(out_vertex).chain(in_vertices.iter()).collect(),
            Endpoints::HyperEdge { vertices } => vertices.iter().collect(),
            Endpoints::Vertex(_) | Endpoints::Graph => Vec::new(),
        }
    }

    /// Flatten into a JSON object using the configured key names.
    ///
    /// Properties are written alongside the id, revision and label; a
    /// property whose key collides with one of those names is skipped.
    pub fn to_record(&self, keys: &KeyNames) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
        let mut record = serde_json::Map::new();
        record.insert(keys.id.clone(), serde_json::to_value(&self.id)?);
        record.insert(keys.revision.clone(), serde_json::to_value(&self.revision)?);
        record.insert(keys.label.clone(), serde_json::to_value(&self.label)?);

        for (key, value) in self.properties.iter() {
            let name = match serde_json::to_value(key)? {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if record.contains_key(&name) {
                continue;
            }
            record.insert(name, serde_json::to_value(value)?);
        }

        match &self.endpoints {
            Endpoints::Edge {
                out_vertex,
                in_vertex,
            } => {
                record.insert("out".to_string(), serde_json::to_value(out_vertex)?);
                record.insert("in".to_string(), serde_json::to_value(in_vertex)?);
            }
            Endpoints::MultiEdge {
                out_vertex,
                in_vertices,
            } => {
                record.insert("out".to_string(), serde_json::to_value(out_vertex)?);
                record.insert("in".to_string(), serde_json::to_value(in_vertices)?);
            }
            Endpoints::HyperEdge { vertices } => {
                record.insert("vertices".to_string(), serde_json::to_value(vertices)?);
            }
            Endpoints::Vertex(_) | Endpoints::Graph => {}
        }
        Ok(record)
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyBag<T::Key, T::Value> {
        &mut self.properties
    }

    pub(crate) fn set_revision(&mut self, revision: T::Revision) {
        self.revision = revision;
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }

    pub(crate) fn adjacency_mut(&mut self) -> Option<&mut Adjacency<T::Id>> {
        match &mut self.endpoints {
            Endpoints::Vertex(adjacency) => Some(adjacency),
            _ => None,
        }
    }
}

impl<T: GraphTypes> PartialEq for Element<T> {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id == other.id
    }
}

impl<T: GraphTypes> Eq for Element<T> {}

impl<T: GraphTypes> Hash for Element<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.id.hash(state);
    }
}

/// Addresses one element of a graph, or the graph itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ElementRef<Id> {
    Vertex(Id),
    Edge(Id),
    #[serde(rename = "multiedge")]
    MultiEdge(Id),
    #[serde(rename = "hyperedge")]
    HyperEdge(Id),
    Graph,
}

impl<Id> ElementRef<Id> {
    /// Build a reference of the given kind; `ElementKind::Graph` ignores `id`
    pub fn new(kind: ElementKind, id: Id) -> Self {
        match kind {
            ElementKind::Vertex => Self::Vertex(id),
            ElementKind::Edge => Self::Edge(id),
            ElementKind::MultiEdge => Self::MultiEdge(id),
            ElementKind::HyperEdge => Self::HyperEdge(id),
            ElementKind::Graph => Self::Graph,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Vertex(_) => ElementKind::Vertex,
            Self::Edge(_) => ElementKind::Edge,
            Self::MultiEdge(_) => ElementKind::MultiEdge,
            Self::HyperEdge(_) => ElementKind::HyperEdge,
            Self::Graph => ElementKind::Graph,
        }
    }

    pub fn id(&self) -> Option<&Id> {
        match self {
            Self::Vertex(id) | Self::Edge(id) | Self::MultiEdge(id) | Self::HyperEdge(id) => Some(id),
            Self::Graph => None,
        }
    }
}

impl<Id: std::fmt::Debug> std::fmt::Display for ElementRef<Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{} {:?}", self.kind(), id),
            None => write!(f, "graph"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DefaultTypes;
    use crate::value::Value;

    fn vertex(id: &str) -> Element<DefaultTypes> {
        Element::new(
            id.to_string(),
            1,
            "person".to_string(),
            PropertyBag::new(),
            Endpoints::Vertex(Adjacency::default()),
        )
    }

    #[test]
    fn test_equality_ignores_properties() {
        let a = vertex("a");
        let mut b = vertex("a");
        b.properties_mut().set("name".into(), "Bob".into()).unwrap();
        b.set_revision(9);

        assert_eq!(a, b);
        assert_ne!(a, vertex("c"));
    }

    #[test]
    fn test_same_id_different_kind_differs() {
        let v = vertex("x");
        let e: Element<DefaultTypes> = Element::new(
            "x".to_string(),
            1,
            "knows".to_string(),
            PropertyBag::new(),
            Endpoints::Edge {
                out_vertex: "a".to_string(),
                in_vertex: "b".to_string(),
            },
        );
        assert_ne!(v, e);
        assert_eq!(e.incident_vertices(), vec!["a", "b"]);
        assert_eq!(e.out_vertex().map(String::as_str), Some("a"));
        assert!(e.adjacency().is_none());
        assert_eq!(e.out_edges().count(), 0);
    }

    #[test]
    fn test_to_record_uses_key_names() {
        let mut v = vertex("alice");
        v.properties_mut().set("age".into(), Value::Int(30)).unwrap();
        v.properties_mut().set("Id".into(), "shadowed".into()).unwrap();

        let record = v.to_record(&KeyNames::default()).unwrap();
        assert_eq!(record["Id"], serde_json::json!("alice"));
        assert_eq!(record["RevId"], serde_json::json!(1));
        assert_eq!(record["Label"], serde_json::json!("person"));
        assert_eq!(record["age"], serde_json::json!(30));
    }

    #[test]
    fn test_reference_display() {
        let r = ElementRef::Edge("e1".to_string());
        assert_eq!(r.to_string(), "edge \"e1\"");
        assert_eq!(ElementRef::<String>::Graph.to_string(), "graph");
        assert_eq!(vertex("v").reference(), ElementRef::Vertex("v".to_string()));
    }
}
