//! JSON import/export images of a graph
//!
//! A snapshot is a plain copy of the four arenas. Importing replays every
//! record through the regular Add operations, so ids, endpoints and hooks
//! are checked exactly as for interactive use.

use crate::element::Endpoints;
use crate::error::{Error, Result};
use crate::graph::{Draft, PropertyGraph};
use crate::properties::PropertyBag;
use crate::types::{ElementKind, GraphTypes};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VertexRecord<T: GraphTypes> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<T::Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<T::Label>,
    #[serde(default)]
    pub properties: PropertyBag<T::Key, T::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EdgeRecord<T: GraphTypes> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<T::Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<T::Label>,
    pub out: T::Id,
    #[serde(rename = "in")]
    pub in_: T::Id,
    #[serde(default)]
    pub properties: PropertyBag<T::Key, T::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MultiEdgeRecord<T: GraphTypes> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<T::Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<T::Label>,
    pub out: T::Id,
    #[serde(rename = "in")]
    pub in_: Vec<T::Id>,
    #[serde(default)]
    pub properties: PropertyBag<T::Key, T::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HyperEdgeRecord<T: GraphTypes> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<T::Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<T::Label>,
    pub vertices: Vec<T::Id>,
    #[serde(default)]
    pub properties: PropertyBag<T::Key, T::Value>,
}

/// Everything in a graph, as serializable records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct GraphSnapshot<T: GraphTypes> {
    #[serde(default)]
    pub properties: PropertyBag<T::Key, T::Value>,
    #[serde(default)]
    pub vertices: Vec<VertexRecord<T>>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord<T>>,
    #[serde(default)]
    pub multi_edges: Vec<MultiEdgeRecord<T>>,
    #[serde(default)]
    pub hyper_edges: Vec<HyperEdgeRecord<T>>,
}

impl<T: GraphTypes> Default for GraphSnapshot<T> {
    fn default() -> Self {
        Self {
            properties: PropertyBag::default(),
            vertices: Vec::new(),
            edges: Vec::new(),
            multi_edges: Vec::new(),
            hyper_edges: Vec::new(),
        }
    }
}

impl<T: GraphTypes> GraphSnapshot<T> {
    /// Copy every element of `graph` under one consistent read
    pub fn from_graph(graph: &PropertyGraph<T>) -> Result<Self> {
        let store = graph.read()?;
        let mut snapshot = Self {
            properties: store.graph.properties().clone(),
            ..Self::default()
        };

        for vertex in store.vertices.values() {
            snapshot.vertices.push(VertexRecord {
                id: Some(vertex.id().clone()),
                label: Some(vertex.label().clone()),
                properties: vertex.properties().clone(),
            });
        }
        for edge in store.edges.values() {
            if let Endpoints::Edge { out_vertex, in_vertex } = edge.endpoints() {
                snapshot.edges.push(EdgeRecord {
                    id: Some(edge.id().clone()),
                    label: Some(edge.label().clone()),
                    out: out_vertex.clone(),
                    in_: in_vertex.clone(),
                    properties: edge.properties().clone(),
                });
            }
        }
        for multi_edge in store.multi_edges.values() {
            if let Endpoints::MultiEdge { out_vertex, in_vertices } = multi_edge.endpoints() {
                snapshot.multi_edges.push(MultiEdgeRecord {
                    id: Some(multi_edge.id().clone()),
                    label: Some(multi_edge.label().clone()),
                    out: out_vertex.clone(),
                    in_: in_vertices.iter().cloned().collect(),
                    properties: multi_edge.properties().clone(),
                });
            }
        }
        for hyper_edge in store.hyper_edges.values() {
            if let Endpoints::HyperEdge { vertices } = hyper_edge.endpoints() {
                snapshot.hyper_edges.push(HyperEdgeRecord {
                    id: Some(hyper_edge.id().clone()),
                    label: Some(hyper_edge.label().clone()),
                    vertices: vertices.iter().cloned().collect(),
                    properties: hyper_edge.properties().clone(),
                });
            }
        }
        Ok(snapshot)
    }

    /// Total number of element records
    pub fn len(&self) -> usize {
        self.vertices.len() + self.edges.len() + self.multi_edges.len() + self.hyper_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add every record to `graph`: vertices first, then edges, multiedges
    /// and hyperedges. Stops at the first record that fails.
    pub fn restore_into(self, graph: &PropertyGraph<T>) -> Result<()> {
        for (key, value) in self.properties.iter() {
            graph.set_property(&crate::ElementRef::Graph, key.clone(), value.clone())?;
        }

        for record in self.vertices {
            graph.add_vertex(draft(record.id, record.label, record.properties))?;
        }
        for record in self.edges {
            let label = match record.label {
                Some(label) => label,
                None => default_label(graph, ElementKind::Edge)?,
            };
            graph.add_edge_with(
                &record.out,
                label,
                &record.in_,
                draft(record.id, None, record.properties),
            )?;
        }
        for record in self.multi_edges {
            graph.add_multi_edge(
                &record.out,
                record.in_,
                draft(record.id, record.label, record.properties),
            )?;
        }
        for record in self.hyper_edges {
            graph.add_hyper_edge(
                record.vertices,
                draft(record.id, record.label, record.properties),
            )?;
        }
        tracing::debug!("Restored snapshot into graph {:?}", graph.id());
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T: GraphTypes> PropertyGraph<T> {
    pub fn snapshot(&self) -> Result<GraphSnapshot<T>> {
        GraphSnapshot::from_graph(self)
    }
}

fn draft<T: GraphTypes>(
    id: Option<T::Id>,
    label: Option<T::Label>,
    properties: PropertyBag<T::Key, T::Value>,
) -> Draft<T> {
    Draft {
        id,
        label,
        properties: properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn default_label<T: GraphTypes>(graph: &PropertyGraph<T>, kind: ElementKind) -> Result<T::Label> {
    graph
        .config()
        .kind(kind)
        .map(|config| config.default_label.clone())
        .ok_or_else(|| Error::Internal(format!("no configuration for {} elements", kind)))
}
