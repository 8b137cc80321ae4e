//! Graph traversal steps
//!
//! [`ElementsPipe`] is the root of a traversal: it enumerates one element
//! kind of a [`PropertyGraph`] lazily and takes no source. The step
//! functions build pipes that move from elements to their neighbours or
//! project a value out of each element.
//!
//! Graph errors raised inside a step are logged and the offending element
//! contributes nothing.

use crate::cursor::{Cursor, Source};
use crate::path::Path;
use crate::pipe::{FlatMapPipe, MapPipe, Pipe};
use pipegraph_core::{Direction, Element, ElementKind, Elements, GraphTypes, PropertyGraph, Result};
use std::collections::BTreeSet;

type Selector<T> = Box<dyn FnMut(&Element<T>) -> bool>;

enum Selection<T: GraphTypes> {
    All,
    Ids(Vec<T::Id>),
    Labels(Vec<T::Label>),
}

/// Root pipe enumerating the elements of one kind
pub struct ElementsPipe<T: GraphTypes> {
    graph: PropertyGraph<T>,
    kind: ElementKind,
    selection: Selection<T>,
    filter: Option<Selector<T>>,
    elements: Option<Elements<T>>,
    current: Option<Element<T>>,
    disposed: bool,
}

/// Root over vertices
pub type VerticesPipe<T> = ElementsPipe<T>;
/// Root over edges
pub type EdgesPipe<T> = ElementsPipe<T>;
/// Root over multiedges
pub type MultiEdgesPipe<T> = ElementsPipe<T>;
/// Root over hyperedges
pub type HyperEdgesPipe<T> = ElementsPipe<T>;

impl<T: GraphTypes> ElementsPipe<T> {
    pub fn new(graph: &PropertyGraph<T>, kind: ElementKind) -> Self {
        Self {
            graph: graph.clone(),
            kind,
            selection: Selection::All,
            filter: None,
            elements: None,
            current: None,
            disposed: false,
        }
    }

    pub fn vertices(graph: &PropertyGraph<T>) -> VerticesPipe<T> {
        Self::new(graph, ElementKind::Vertex)
    }

    pub fn edges(graph: &PropertyGraph<T>) -> EdgesPipe<T> {
        Self::new(graph, ElementKind::Edge)
    }

    pub fn multi_edges(graph: &PropertyGraph<T>) -> MultiEdgesPipe<T> {
        Self::new(graph, ElementKind::MultiEdge)
    }

    pub fn hyper_edges(graph: &PropertyGraph<T>) -> HyperEdgesPipe<T> {
        Self::new(graph, ElementKind::HyperEdge)
    }

    /// Vertices with the given ids, in that order; unknown ids are skipped
    pub fn vertices_by_id(graph: &PropertyGraph<T>, ids: impl IntoIterator<Item = T::Id>) -> VerticesPipe<T> {
        Self::vertices(graph).with_ids(ids)
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = T::Id>) -> Self {
        self.selection = Selection::Ids(ids.into_iter().collect());
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = T::Label>) -> Self {
        self.selection = Selection::Labels(labels.into_iter().collect());
        self
    }

    pub fn with_filter(mut self, filter: impl FnMut(&Element<T>) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    fn start(&self) -> Elements<T> {
        match &self.selection {
            Selection::All => self.graph.elements(self.kind),
            Selection::Ids(ids) => self.graph.elements_by_id(self.kind, ids.iter().cloned()),
            Selection::Labels(labels) => self.graph.elements_by_label(self.kind, labels.iter().cloned()),
        }
    }
}

impl<T: GraphTypes> Cursor<Element<T>> for ElementsPipe<T> {
    fn move_next(&mut self) -> bool {
        self.current = None;
        if self.disposed {
            return false;
        }
        if self.elements.is_none() {
            self.elements = Some(self.start());
        }
        let Some(elements) = self.elements.as_mut() else {
            return false;
        };
        for element in elements.by_ref() {
            if self.filter.as_mut().map_or(true, |filter| filter(&element)) {
                self.current = Some(element);
                return true;
            }
        }
        false
    }

    fn current(&self) -> Option<&Element<T>> {
        self.current.as_ref()
    }

    /// The next advance re-reads the graph
    fn reset(&mut self) {
        self.elements = None;
        self.current = None;
    }

    fn dispose(&mut self) {
        self.elements = None;
        self.current = None;
        self.disposed = true;
    }

    fn path(&self) -> Path {
        self.current.clone().map(Path::of).unwrap_or_default()
    }
}

impl<T: GraphTypes> Pipe<(), Element<T>> for ElementsPipe<T> {
    fn set_source(&mut self, _source: Source<()>) {
        tracing::warn!("Ignoring source set on a {} root pipe", self.kind);
    }

    fn accepts_source(&self) -> bool {
        false
    }
}

/// A step from each element to zero or more values
pub type Step<T, E> = FlatMapPipe<Element<T>, E>;

type Found<T> = Box<dyn Iterator<Item = Element<T>>>;

fn logged<T: GraphTypes>(step: &str, element: &Element<T>, found: Result<Elements<T>>) -> Found<T> {
    match found {
        Ok(elements) => Box::new(elements),
        Err(e) => {
            tracing::warn!("{} step failed at {} {:?}: {}", step, element.kind(), element.id(), e);
            Box::new(std::iter::empty())
        }
    }
}

fn resolve_vertices<T: GraphTypes>(graph: &PropertyGraph<T>, step: &str, element: &Element<T>, ids: Vec<T::Id>) -> Found<T> {
    if ids.is_empty() {
        return Box::new(std::iter::empty());
    }
    logged(step, element, Ok(graph.vertices_by_id(ids)))
}

fn label_set<T: GraphTypes>(labels: impl IntoIterator<Item = T::Label>) -> BTreeSet<T::Label> {
    labels.into_iter().collect()
}

fn edges_step<T: GraphTypes>(
    graph: &PropertyGraph<T>,
    direction: Direction,
    labels: impl IntoIterator<Item = T::Label>,
) -> Step<T, Element<T>> {
    let graph = graph.clone();
    let labels = label_set::<T>(labels);
    FlatMapPipe::new(move |vertex: &Element<T>| {
        let labels = labels.clone();
        logged("edges", vertex, graph.edges_of(vertex.id(), direction))
            .filter(move |edge| labels.is_empty() || labels.contains(edge.label()))
    })
}

/// Edges leaving each vertex, optionally restricted to `labels`
pub fn out_edges<T: GraphTypes>(
    graph: &PropertyGraph<T>,
    labels: impl IntoIterator<Item = T::Label>,
) -> Step<T, Element<T>> {
    edges_step(graph, Direction::Outgoing, labels)
}

/// Edges arriving at each vertex, optionally restricted to `labels`
pub fn in_edges<T: GraphTypes>(
    graph: &PropertyGraph<T>,
    labels: impl IntoIterator<Item = T::Label>,
) -> Step<T, Element<T>> {
    edges_step(graph, Direction::Incoming, labels)
}

pub fn both_edges<T: GraphTypes>(
    graph: &PropertyGraph<T>,
    labels: impl IntoIterator<Item = T::Label>,
) -> Step<T, Element<T>> {
    edges_step(graph, Direction::Both, labels)
}

/// The tail vertex of each edge or multiedge
pub fn out_vertex<T: GraphTypes>(graph: &PropertyGraph<T>) -> Step<T, Element<T>> {
    let graph = graph.clone();
    FlatMapPipe::new(move |edge: &Element<T>| {
        let ids = edge.out_vertex().cloned().into_iter().collect();
        resolve_vertices(&graph, "out_vertex", edge, ids)
    })
}

/// The head vertex of each edge, or every in-vertex of a multiedge
pub fn in_vertex<T: GraphTypes>(graph: &PropertyGraph<T>) -> Step<T, Element<T>> {
    let graph = graph.clone();
    FlatMapPipe::new(move |edge: &Element<T>| {
        let ids = match (edge.in_vertex(), edge.in_vertices()) {
            (Some(id), _) => vec![id.clone()],
            (None, Some(ids)) => ids.iter().cloned().collect(),
            (None, None) => Vec::new(),
        };
        resolve_vertices(&graph, "in_vertex", edge, ids)
    })
}

fn adjacent_step<T: GraphTypes>(
    graph: &PropertyGraph<T>,
    direction: Direction,
    labels: impl IntoIterator<Item = T::Label>,
) -> Step<T, Element<T>> {
    let graph = graph.clone();
    let labels = label_set::<T>(labels);
    FlatMapPipe::new(move |vertex: &Element<T>| {
        let wanted = |edge: &Element<T>| labels.is_empty() || labels.contains(edge.label());
        let mut ids = Vec::new();
        if direction != Direction::Incoming {
            ids.extend(
                logged("out", vertex, graph.out_edges_of(vertex.id()))
                    .filter(|edge| wanted(edge))
                    .filter_map(|edge| edge.in_vertex().cloned()),
            );
        }
        if direction != Direction::Outgoing {
            ids.extend(
                logged("in", vertex, graph.in_edges_of(vertex.id()))
                    .filter(|edge| wanted(edge))
                    .filter_map(|edge| edge.out_vertex().cloned()),
            );
        }
        resolve_vertices(&graph, "adjacent", vertex, ids)
    })
}

/// Vertices reached over outgoing edges. A vertex reachable over several
/// edges is produced once per edge.
pub fn out<T: GraphTypes>(graph: &PropertyGraph<T>, labels: impl IntoIterator<Item = T::Label>) -> Step<T, Element<T>> {
    adjacent_step(graph, Direction::Outgoing, labels)
}

/// Vertices reached over incoming edges
pub fn in_<T: GraphTypes>(graph: &PropertyGraph<T>, labels: impl IntoIterator<Item = T::Label>) -> Step<T, Element<T>> {
    adjacent_step(graph, Direction::Incoming, labels)
}

pub fn both<T: GraphTypes>(graph: &PropertyGraph<T>, labels: impl IntoIterator<Item = T::Label>) -> Step<T, Element<T>> {
    adjacent_step(graph, Direction::Both, labels)
}

/// The value of `key` on each element; elements without it are skipped
pub fn property<T: GraphTypes>(key: T::Key) -> Step<T, T::Value> {
    FlatMapPipe::new(move |element: &Element<T>| element.property(&key).cloned())
}

pub fn label<T: GraphTypes>() -> MapPipe<Element<T>, T::Label> {
    MapPipe::new(|element: &Element<T>| element.label().clone())
}

pub fn id<T: GraphTypes>() -> MapPipe<Element<T>, T::Id> {
    MapPipe::new(|element: &Element<T>| element.id().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::{connect, Pipeline};
    use pipegraph_core::{DefaultTypes, Draft, Value};

    fn social() -> PropertyGraph {
        let graph = PropertyGraph::new();
        for (id, age) in [("alice", 30i64), ("bob", 25), ("carol", 41)] {
            graph
                .add_vertex(Draft::new().with_id(id).with_label("person").with_property("age", age))
                .unwrap();
        }
        graph.add_vertex(Draft::new().with_id("acme").with_label("company")).unwrap();
        graph.add_edge(&"alice".into(), "knows", &"bob".into()).unwrap();
        graph.add_edge(&"alice".into(), "knows", &"carol".into()).unwrap();
        graph.add_edge(&"carol".into(), "works_at", &"acme".into()).unwrap();
        graph
    }

    fn ids(elements: impl Iterator<Item = Element<DefaultTypes>>) -> Vec<String> {
        let mut ids: Vec<String> = elements.map(|e| e.id().clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_root_rejects_sources() {
        let graph = social();
        let mut root = ElementsPipe::vertices(&graph);
        assert!(!root.accepts_source());
        root.set_source(Source::single(()));
        assert_eq!(Pipeline::new(root).count(), 4);
    }

    #[test]
    fn test_labels_and_filters() {
        let graph = social();
        let people = ElementsPipe::vertices(&graph)
            .with_labels(vec!["person".to_string()])
            .with_filter(|v| v.property(&"age".to_string()).and_then(Value::as_int) > Some(26));
        assert_eq!(ids(Pipeline::new(people)), vec!["alice", "carol"]);
    }

    #[test]
    fn test_out_with_labels() {
        let graph = social();
        let root = ElementsPipe::vertices_by_id(&graph, vec!["alice".to_string(), "carol".to_string()]);
        let step = connect(root, out(&graph, vec!["knows".to_string()]));
        assert_eq!(ids(Pipeline::new(step)), vec!["bob", "carol"]);
    }

    #[test]
    fn test_edge_endpoints() {
        let graph = social();
        let edges = connect(ElementsPipe::vertices_by_id(&graph, vec!["carol".to_string()]), both_edges(&graph, Vec::new()));
        let tails = connect(edges, out_vertex(&graph));
        assert_eq!(ids(Pipeline::new(tails)), vec!["alice", "carol"]);

        let heads = connect(ElementsPipe::edges(&graph), in_vertex(&graph));
        assert_eq!(ids(Pipeline::new(heads)), vec!["acme", "bob", "carol"]);
    }

    #[test]
    fn test_multi_edge_in_vertices() {
        let graph = social();
        graph
            .add_multi_edge(&"alice".into(), vec!["bob".into(), "carol".into()], Draft::new())
            .unwrap();
        let heads = connect(ElementsPipe::multi_edges(&graph), in_vertex(&graph));
        assert_eq!(ids(Pipeline::new(heads)), vec!["bob", "carol"]);
    }

    #[test]
    fn test_projection_steps() {
        let graph = social();
        let ages = connect(ElementsPipe::vertices(&graph), property::<DefaultTypes>("age".to_string()));
        let mut ages: Vec<i64> = Pipeline::new(ages).filter_map(|v| v.as_int()).collect();
        ages.sort();
        assert_eq!(ages, vec![25, 30, 41]);

        let labels = connect(ElementsPipe::edges(&graph), label::<DefaultTypes>());
        assert_eq!(Pipeline::new(labels).filter(|l| l == "knows").count(), 2);
    }

    #[test]
    fn test_path_through_steps() {
        let graph = social();
        let root = ElementsPipe::vertices_by_id(&graph, vec!["carol".to_string()]);
        let edges = connect(root, out_edges(&graph, Vec::new()));
        let mut walk = connect(edges, in_vertex(&graph));

        assert!(walk.move_next());
        let path = walk.path();
        let ids: Vec<&String> = path.values::<Element<DefaultTypes>>().into_iter().map(|e| e.id()).collect();
        assert_eq!(path.len(), 3);
        assert_eq!(ids[0], "carol");
        assert_eq!(ids[2], "acme");
    }

    #[test]
    fn test_building_reads_nothing_and_reset_replays() {
        let graph = social();
        let mut pipe = connect(ElementsPipe::vertices(&graph), id::<DefaultTypes>());
        // Added after the chain is built but before the first advance
        graph.add_vertex(Draft::new().with_id("dave")).unwrap();

        assert!(pipe.move_next());
        let first = pipe.current().cloned();
        assert!(pipe.move_next());

        pipe.reset();
        assert!(pipe.move_next());
        assert_eq!(pipe.current().cloned(), first);
        assert_eq!(Pipeline::new(pipe).count(), 4);
    }

    #[test]
    fn test_dispose_ends_root() {
        let graph = social();
        let mut root = ElementsPipe::vertices(&graph);
        root.move_next();
        root.dispose();
        assert!(!root.move_next());
        root.reset();
        assert!(!root.move_next());
    }
}
