//! The property graph container
//!
//! [`PropertyGraph`] owns four id-keyed arenas (vertices, edges, multiedges,
//! hyperedges) behind one `RwLock`. Every change to a vertex's adjacency
//! happens inside a single write-lock scope, so readers never see an edge
//! registered at only one of its endpoints. Enumerations are lazy: they
//! snapshot ids on first use and resolve each element under a brief read
//! lock, skipping elements removed in the meantime.

use crate::config::{GraphConfig, GraphSettings, KindConfig};
use crate::element::{Adjacency, Edge, Element, ElementRef, Endpoints, HyperEdge, MultiEdge, Vertex};
use crate::error::{Error, Result, Veto};
use crate::hooks::{self, ChangeGate, GraphEvent, HookRegistry};
use crate::properties::{PropertyBag, PropertyChange};
use crate::types::{DefaultTypes, Direction, ElementKind, GraphTypes};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Generated ids tried before an Add gives up on a generator that keeps
/// returning ids already in use
const MAX_ID_DRAWS: usize = 1024;

/// Optional id, label and initial properties for a new element
#[derive(Debug, Clone)]
pub struct Draft<T: GraphTypes> {
    pub id: Option<T::Id>,
    pub label: Option<T::Label>,
    pub properties: Vec<(T::Key, T::Value)>,
}

impl<T: GraphTypes> Draft<T> {
    pub fn new() -> Self {
        Self {
            id: None,
            label: None,
            properties: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<T::Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<T::Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<T::Key>, value: impl Into<T::Value>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

impl<T: GraphTypes> Default for Draft<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Store<T: GraphTypes> {
    pub(crate) graph: Element<T>,
    pub(crate) vertices: BTreeMap<T::Id, Element<T>>,
    pub(crate) edges: BTreeMap<T::Id, Element<T>>,
    pub(crate) multi_edges: BTreeMap<T::Id, Element<T>>,
    pub(crate) hyper_edges: BTreeMap<T::Id, Element<T>>,
    pub(crate) shut_down: bool,
    next_epoch: u64,
}

impl<T: GraphTypes> Store<T> {
    fn new(graph: Element<T>) -> Self {
        Self {
            graph,
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            multi_edges: BTreeMap::new(),
            hyper_edges: BTreeMap::new(),
            shut_down: false,
            next_epoch: 0,
        }
    }

    pub(crate) fn arena(&self, kind: ElementKind) -> Option<&BTreeMap<T::Id, Element<T>>> {
        match kind {
            ElementKind::Vertex => Some(&self.vertices),
            ElementKind::Edge => Some(&self.edges),
            ElementKind::MultiEdge => Some(&self.multi_edges),
            ElementKind::HyperEdge => Some(&self.hyper_edges),
            ElementKind::Graph => None,
        }
    }

    fn arena_mut(&mut self, kind: ElementKind) -> Option<&mut BTreeMap<T::Id, Element<T>>> {
        match kind {
            ElementKind::Vertex => Some(&mut self.vertices),
            ElementKind::Edge => Some(&mut self.edges),
            ElementKind::MultiEdge => Some(&mut self.multi_edges),
            ElementKind::HyperEdge => Some(&mut self.hyper_edges),
            ElementKind::Graph => None,
        }
    }

    fn get(&self, kind: ElementKind, id: &T::Id) -> Option<&Element<T>> {
        self.arena(kind).and_then(|arena| arena.get(id))
    }

    fn element(&self, target: &ElementRef<T::Id>) -> Option<&Element<T>> {
        match target.id() {
            Some(id) => self.get(target.kind(), id),
            None => Some(&self.graph),
        }
    }

    fn element_mut(&mut self, target: &ElementRef<T::Id>) -> Option<&mut Element<T>> {
        match target.id() {
            Some(id) => self
                .arena_mut(target.kind())
                .and_then(|arena| arena.get_mut(id)),
            None => Some(&mut self.graph),
        }
    }

    fn adjacency_mut(&mut self, vertex: &T::Id) -> Option<&mut Adjacency<T::Id>> {
        self.vertices.get_mut(vertex).and_then(|v| v.adjacency_mut())
    }

    /// Everything that must hold for `element` to be inserted now
    fn check_insertable(&self, element: &Element<T>) -> Result<()> {
        if self.shut_down {
            return Err(Error::ShutDown);
        }
        let kind = element.kind();
        if self.get(kind, element.id()).is_some() {
            return Err(Error::duplicate(kind, element.id()));
        }
        for vertex in element.incident_vertices() {
            if !self.vertices.contains_key(vertex) {
                return Err(Error::unknown(ElementKind::Vertex, vertex));
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut element: Element<T>) {
        self.next_epoch += 1;
        element.set_epoch(self.next_epoch);
        self.link(&element);
        let kind = element.kind();
        if let Some(arena) = self.arena_mut(kind) {
            arena.insert(element.id().clone(), element);
        }
    }

    fn link(&mut self, element: &Element<T>) {
        let id = element.id();
        match element.endpoints() {
            Endpoints::Edge {
                out_vertex,
                in_vertex,
            } => {
                if let Some(adjacency) = self.adjacency_mut(out_vertex) {
                    adjacency.out_edges.insert(id.clone());
                }
                if let Some(adjacency) = self.adjacency_mut(in_vertex) {
                    adjacency.in_edges.insert(id.clone());
                }
            }
            Endpoints::MultiEdge {
                out_vertex,
                in_vertices,
            } => {
                if let Some(adjacency) = self.adjacency_mut(out_vertex) {
                    adjacency.out_multi_edges.insert(id.clone());
                }
                for vertex in in_vertices {
                    if let Some(adjacency) = self.adjacency_mut(vertex) {
                        adjacency.in_multi_edges.insert(id.clone());
                    }
                }
            }
            Endpoints::HyperEdge { vertices } => {
                for vertex in vertices {
                    if let Some(adjacency) = self.adjacency_mut(vertex) {
                        adjacency.hyper_edges.insert(id.clone());
                    }
                }
            }
            Endpoints::Vertex(_) | Endpoints::Graph => {}
        }
    }

    fn unlink(&mut self, element: &Element<T>) {
        let id = element.id();
        match element.endpoints() {
            Endpoints::Edge {
                out_vertex,
                in_vertex,
            } => {
                if let Some(adjacency) = self.adjacency_mut(out_vertex) {
                    adjacency.out_edges.remove(id);
                }
                if let Some(adjacency) = self.adjacency_mut(in_vertex) {
                    adjacency.in_edges.remove(id);
                }
            }
            Endpoints::MultiEdge {
                out_vertex,
                in_vertices,
            } => {
                if let Some(adjacency) = self.adjacency_mut(out_vertex) {
                    adjacency.out_multi_edges.remove(id);
                }
                for vertex in in_vertices {
                    if let Some(adjacency) = self.adjacency_mut(vertex) {
                        adjacency.in_multi_edges.remove(id);
                    }
                }
            }
            Endpoints::HyperEdge { vertices } => {
                for vertex in vertices {
                    if let Some(adjacency) = self.adjacency_mut(vertex) {
                        adjacency.hyper_edges.remove(id);
                    }
                }
            }
            Endpoints::Vertex(_) | Endpoints::Graph => {}
        }
    }

    /// Remove one element, cascading from a vertex to everything incident
    /// to it. Unknown ids are ignored.
    fn remove(&mut self, kind: ElementKind, id: &T::Id, removed: &mut Vec<Element<T>>) {
        if kind != ElementKind::Vertex {
            self.remove_connector(kind, id, removed);
            return;
        }

        let Some(adjacency) = self.vertices.get(id).and_then(|v| v.adjacency()).cloned() else {
            return;
        };
        let before = removed.len();
        for edge in adjacency.out_edges.union(&adjacency.in_edges) {
            self.remove_connector(ElementKind::Edge, edge, removed);
        }
        for multi_edge in adjacency.out_multi_edges.union(&adjacency.in_multi_edges) {
            self.remove_connector(ElementKind::MultiEdge, multi_edge, removed);
        }
        for hyper_edge in &adjacency.hyper_edges {
            self.remove_connector(ElementKind::HyperEdge, hyper_edge, removed);
        }
        if removed.len() > before {
            tracing::debug!(
                "Removing vertex {:?} cascaded to {} incident elements",
                id,
                removed.len() - before
            );
        }
        if let Some(vertex) = self.vertices.remove(id) {
            removed.push(vertex);
        }
    }

    fn remove_connector(&mut self, kind: ElementKind, id: &T::Id, removed: &mut Vec<Element<T>>) {
        if let Some(element) = self.arena_mut(kind).and_then(|arena| arena.remove(id)) {
            self.unlink(&element);
            removed.push(element);
        }
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.multi_edges.clear();
        self.hyper_edges.clear();
    }
}

struct GraphInner<T: GraphTypes> {
    config: GraphConfig<T>,
    store: RwLock<Store<T>>,
    hooks: RwLock<HookRegistry<T>>,
}

/// An in-memory property graph.
///
/// Cloning is cheap and yields another handle to the same graph. The graph
/// is itself an element: it has an id, a label and a property bag,
/// addressed through [`ElementRef::Graph`].
pub struct PropertyGraph<T: GraphTypes = DefaultTypes> {
    inner: Arc<GraphInner<T>>,
}

impl<T: GraphTypes> Clone for PropertyGraph<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: GraphTypes> std::fmt::Debug for PropertyGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGraph")
            .field("id", &self.inner.config.graph_id)
            .field("label", &self.inner.config.graph_label)
            .finish_non_exhaustive()
    }
}

impl PropertyGraph<DefaultTypes> {
    /// String-keyed graph with ULID ids and counter revisions
    pub fn new() -> Self {
        Self::build(GraphConfig::default())
    }

    pub fn from_settings(settings: &GraphSettings) -> Result<Self> {
        Self::with_config(GraphConfig::from_settings(settings))
    }
}

impl Default for PropertyGraph<DefaultTypes> {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates the named per-kind wrappers around the kind-generic operations
macro_rules! kind_operations {
    (
        $kind:expr, $single:literal, $plural:literal,
        by_id: $by_id:ident,
        all: $all:ident,
        by_ids: $by_ids:ident,
        by_label: $by_label:ident,
        filtered: $filtered:ident,
        count: $count:ident,
        count_where: $count_where:ident,
        remove: $remove:ident,
        remove_by_id: $remove_by_id:ident,
        remove_where: $remove_where:ident $(,)?
    ) => {
        #[doc = concat!("The ", $single, " with this id, if any")]
        pub fn $by_id(&self, id: &T::Id) -> Result<Option<Element<T>>> {
            self.element_by_id($kind, id)
        }

        #[doc = concat!("Lazily enumerate every ", $single)]
        pub fn $all(&self) -> Elements<T> {
            self.elements($kind)
        }

        #[doc = concat!("Lazily resolve ", $plural, " by id, skipping unknown ids")]
        pub fn $by_ids(&self, ids: impl IntoIterator<Item = T::Id>) -> Elements<T> {
            self.elements_by_id($kind, ids)
        }

        #[doc = concat!("Lazily enumerate the ", $plural, " carrying any of these labels")]
        pub fn $by_label(&self, labels: impl IntoIterator<Item = T::Label>) -> Elements<T> {
            self.elements_by_label($kind, labels)
        }

        #[doc = concat!("Lazily enumerate the ", $plural, " accepted by `filter`")]
        pub fn $filtered(&self, filter: impl FnMut(&Element<T>) -> bool + Send + 'static) -> Elements<T> {
            self.elements_where($kind, filter)
        }

        #[doc = concat!("Number of ", $plural, "; constant time")]
        pub fn $count(&self) -> Result<usize> {
            self.count($kind)
        }

        #[doc = concat!("Number of ", $plural, " accepted by `filter`")]
        pub fn $count_where(&self, filter: impl FnMut(&Element<T>) -> bool + Send + 'static) -> Result<usize> {
            self.count_where($kind, filter)
        }

        #[doc = concat!("Remove the given ", $plural, "; elements of other kinds are ignored")]
        pub fn $remove<'a>(&self, elements: impl IntoIterator<Item = &'a Element<T>>) -> Result<Vec<Element<T>>>
        where
            T: 'a,
        {
            let ids: Vec<T::Id> = elements
                .into_iter()
                .filter(|element| element.kind() == $kind)
                .map(|element| element.id().clone())
                .collect();
            self.remove_by_id($kind, ids)
        }

        #[doc = concat!("Remove ", $plural, " by id, skipping unknown ids")]
        pub fn $remove_by_id(&self, ids: impl IntoIterator<Item = T::Id>) -> Result<Vec<Element<T>>> {
            self.remove_by_id($kind, ids)
        }

        #[doc = concat!("Remove every ", $single, " accepted by `filter`")]
        pub fn $remove_where(&self, filter: impl FnMut(&Element<T>) -> bool + Send + 'static) -> Result<Vec<Element<T>>> {
            self.remove_where($kind, filter)
        }
    };
}

impl<T: GraphTypes> PropertyGraph<T> {
    /// Build a graph and run the configured initializer, if any
    pub fn with_config(config: GraphConfig<T>) -> Result<Self> {
        let graph = Self::build(config);
        if let Some(initializer) = graph.inner.config.initializer.clone() {
            initializer(&graph)?;
            tracing::debug!("Initialized graph {:?}", graph.id());
        }
        Ok(graph)
    }

    fn build(config: GraphConfig<T>) -> Self {
        let graph = Element::new(
            config.graph_id.clone(),
            config.next_revision(None),
            config.graph_label.clone(),
            PropertyBag::new(),
            Endpoints::Graph,
        );
        Self {
            inner: Arc::new(GraphInner {
                config,
                store: RwLock::new(Store::new(graph)),
                hooks: RwLock::new(HookRegistry::new()),
            }),
        }
    }

    pub fn id(&self) -> &T::Id {
        &self.inner.config.graph_id
    }

    pub fn label(&self) -> &T::Label {
        &self.inner.config.graph_label
    }

    pub fn config(&self) -> &GraphConfig<T> {
        &self.inner.config
    }

    /// Whether two handles point at the same graph
    pub fn same_graph(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_shut_down(&self) -> Result<bool> {
        Ok(self.read()?.shut_down)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Store<T>>> {
        self.inner.store.read().map_err(Error::lock)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store<T>>> {
        self.inner.store.write().map_err(Error::lock)
    }

    fn hooks(&self) -> Result<RwLockReadGuard<'_, HookRegistry<T>>> {
        self.inner.hooks.read().map_err(Error::lock)
    }

    fn hooks_mut(&self) -> Result<RwLockWriteGuard<'_, HookRegistry<T>>> {
        self.inner.hooks.write().map_err(Error::lock)
    }

    fn kind_config(&self, kind: ElementKind) -> Result<&KindConfig<T>> {
        self.inner
            .config
            .kind(kind)
            .ok_or_else(|| Error::Unsupported(format!("{} elements cannot be added or removed", kind)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a vetoable hook fired before an element of `kind` is added
    pub fn on_adding(
        &self,
        kind: ElementKind,
        name: impl Into<String>,
        hook: impl Fn(&Element<T>) -> std::result::Result<(), Veto> + Send + Sync + 'static,
    ) -> Result<()> {
        self.kind_config(kind)?;
        self.hooks_mut()?.register_adding(kind, name.into(), Arc::new(hook))
    }

    /// Register a hook fired after an element of `kind` is added
    pub fn on_added(
        &self,
        kind: ElementKind,
        name: impl Into<String>,
        hook: impl Fn(&Element<T>) + Send + Sync + 'static,
    ) -> Result<()> {
        self.kind_config(kind)?;
        self.hooks_mut()?.register_added(kind, name.into(), Arc::new(hook))
    }

    /// Register a vetoable hook fired before any property of any element
    /// (or the graph itself) changes
    pub fn on_property_changing(
        &self,
        name: impl Into<String>,
        hook: impl Fn(&ElementRef<T::Id>, &PropertyChange<'_, T::Key, T::Value>) -> std::result::Result<(), Veto>
            + Send
            + Sync
            + 'static,
    ) -> Result<()> {
        self.hooks_mut()?
            .register_property_changing(name.into(), Arc::new(hook))
    }

    pub fn on_property_changed(
        &self,
        name: impl Into<String>,
        hook: impl Fn(&ElementRef<T::Id>, &PropertyChange<'_, T::Key, T::Value>) + Send + Sync + 'static,
    ) -> Result<()> {
        self.hooks_mut()?
            .register_property_changed(name.into(), Arc::new(hook))
    }

    pub fn on_shutting_down(
        &self,
        name: impl Into<String>,
        hook: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<()> {
        self.hooks_mut()?
            .register_shutting_down(name.into(), Arc::new(hook))
    }

    pub fn on_shut_down(&self, name: impl Into<String>, hook: impl Fn(&str) + Send + Sync + 'static) -> Result<()> {
        self.hooks_mut()?.register_shut_down(name.into(), Arc::new(hook))
    }

    /// Names of the hooks registered for `event`, in invocation order
    pub fn hook_names(&self, event: GraphEvent) -> Result<Vec<String>> {
        Ok(self.hooks()?.names(event))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Adding
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_vertex(&self, draft: Draft<T>) -> Result<Vertex<T>> {
        self.add(ElementKind::Vertex, draft, Endpoints::Vertex(Adjacency::default()))
    }

    /// Add a directed edge from `out_vertex` to `in_vertex`
    pub fn add_edge(&self, out_vertex: &T::Id, label: impl Into<T::Label>, in_vertex: &T::Id) -> Result<Edge<T>> {
        self.add_edge_with(out_vertex, label, in_vertex, Draft::new())
    }

    /// Like [`add_edge`](Self::add_edge), with an explicit id and initial
    /// properties; `label` overrides any label on the draft
    pub fn add_edge_with(
        &self,
        out_vertex: &T::Id,
        label: impl Into<T::Label>,
        in_vertex: &T::Id,
        draft: Draft<T>,
    ) -> Result<Edge<T>> {
        let draft = Draft {
            label: Some(label.into()),
            ..draft
        };
        self.add(
            ElementKind::Edge,
            draft,
            Endpoints::Edge {
                out_vertex: out_vertex.clone(),
                in_vertex: in_vertex.clone(),
            },
        )
    }

    /// Add an edge from one vertex to at least one other
    pub fn add_multi_edge(
        &self,
        out_vertex: &T::Id,
        in_vertices: impl IntoIterator<Item = T::Id>,
        draft: Draft<T>,
    ) -> Result<MultiEdge<T>> {
        let in_vertices: BTreeSet<T::Id> = in_vertices.into_iter().collect();
        if in_vertices.is_empty() {
            return Err(Error::InvalidArgument(
                "multiedge needs at least one in-vertex".to_string(),
            ));
        }
        self.add(
            ElementKind::MultiEdge,
            draft,
            Endpoints::MultiEdge {
                out_vertex: out_vertex.clone(),
                in_vertices,
            },
        )
    }

    /// Add an edge over a set of at least two distinct vertices
    pub fn add_hyper_edge(
        &self,
        vertices: impl IntoIterator<Item = T::Id>,
        draft: Draft<T>,
    ) -> Result<HyperEdge<T>> {
        let vertices: BTreeSet<T::Id> = vertices.into_iter().collect();
        if vertices.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "hyperedge needs at least two distinct vertices, got {}",
                vertices.len()
            )));
        }
        self.add(ElementKind::HyperEdge, draft, Endpoints::HyperEdge { vertices })
    }

    /// Draw generated ids until one is unused, stepping past explicit ids
    /// that took a generator's next value
    fn fresh_id(&self, kind: ElementKind, kind_config: &KindConfig<T>) -> Result<T::Id> {
        let mut id = (kind_config.id_generator)();
        for _ in 0..MAX_ID_DRAWS {
            if self.read()?.get(kind, &id).is_none() {
                return Ok(id);
            }
            tracing::trace!("Generated {} id {:?} is taken", kind, id);
            id = (kind_config.id_generator)();
        }
        Err(Error::duplicate(kind, &id))
    }

    fn add(&self, kind: ElementKind, draft: Draft<T>, endpoints: Endpoints<T::Id>) -> Result<Element<T>> {
        let kind_config = self.kind_config(kind)?;
        let Draft { id, label, properties } = draft;

        let mut bag = PropertyBag::new();
        for (key, value) in properties {
            bag.set(key, value)?;
        }
        let id = match id {
            Some(id) => id,
            None => self.fresh_id(kind, kind_config)?,
        };
        let label = label.unwrap_or_else(|| kind_config.default_label.clone());
        let element = Element::new(id, self.inner.config.next_revision(None), label, bag, endpoints);

        self.read()?.check_insertable(&element)?;

        let adding = self.hooks()?.adding(kind);
        hooks::run_adding(&adding, &element)?;

        {
            let mut store = self.write()?;
            // Re-checked: another writer may have raced us while hooks ran
            store.check_insertable(&element)?;
            store.insert(element.clone());
        }
        tracing::debug!("Added {} {:?}", kind, element.id());

        let added = self.hooks()?.added(kind);
        hooks::run_added(&added, &element);
        Ok(element)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup and enumeration
    // ─────────────────────────────────────────────────────────────────────────

    kind_operations!(
        ElementKind::Vertex, "vertex", "vertices",
        by_id: vertex_by_id,
        all: vertices,
        by_ids: vertices_by_id,
        by_label: vertices_by_label,
        filtered: vertices_where,
        count: number_of_vertices,
        count_where: number_of_vertices_where,
        remove: remove_vertices,
        remove_by_id: remove_vertices_by_id,
        remove_where: remove_vertices_where,
    );

    kind_operations!(
        ElementKind::Edge, "edge", "edges",
        by_id: edge_by_id,
        all: edges,
        by_ids: edges_by_id,
        by_label: edges_by_label,
        filtered: edges_where,
        count: number_of_edges,
        count_where: number_of_edges_where,
        remove: remove_edges,
        remove_by_id: remove_edges_by_id,
        remove_where: remove_edges_where,
    );

    kind_operations!(
        ElementKind::MultiEdge, "multiedge", "multiedges",
        by_id: multi_edge_by_id,
        all: multi_edges,
        by_ids: multi_edges_by_id,
        by_label: multi_edges_by_label,
        filtered: multi_edges_where,
        count: number_of_multi_edges,
        count_where: number_of_multi_edges_where,
        remove: remove_multi_edges,
        remove_by_id: remove_multi_edges_by_id,
        remove_where: remove_multi_edges_where,
    );

    kind_operations!(
        ElementKind::HyperEdge, "hyperedge", "hyperedges",
        by_id: hyper_edge_by_id,
        all: hyper_edges,
        by_ids: hyper_edges_by_id,
        by_label: hyper_edges_by_label,
        filtered: hyper_edges_where,
        count: number_of_hyper_edges,
        count_where: number_of_hyper_edges_where,
        remove: remove_hyper_edges,
        remove_by_id: remove_hyper_edges_by_id,
        remove_where: remove_hyper_edges_where,
    );

    /// Snapshot of one element; `None` when the id is unknown
    pub fn element_by_id(&self, kind: ElementKind, id: &T::Id) -> Result<Option<Element<T>>> {
        Ok(self.read()?.get(kind, id).cloned())
    }

    /// Snapshot of any element, or of the graph itself
    pub fn element(&self, target: &ElementRef<T::Id>) -> Result<Option<Element<T>>> {
        Ok(self.read()?.element(target).cloned())
    }

    pub fn elements(&self, kind: ElementKind) -> Elements<T> {
        Elements::new(self.clone(), kind, Selection::All, None)
    }

    pub fn elements_by_id(&self, kind: ElementKind, ids: impl IntoIterator<Item = T::Id>) -> Elements<T> {
        Elements::new(self.clone(), kind, Selection::Ids(ids.into_iter().collect()), None)
    }

    pub fn elements_by_label(&self, kind: ElementKind, labels: impl IntoIterator<Item = T::Label>) -> Elements<T> {
        Elements::new(
            self.clone(),
            kind,
            Selection::Labels(labels.into_iter().collect()),
            None,
        )
    }

    pub fn elements_where(
        &self,
        kind: ElementKind,
        filter: impl FnMut(&Element<T>) -> bool + Send + 'static,
    ) -> Elements<T> {
        Elements::new(self.clone(), kind, Selection::All, Some(Box::new(filter)))
    }

    /// Number of elements of `kind`, read from the arena size
    pub fn count(&self, kind: ElementKind) -> Result<usize> {
        Ok(self.read()?.arena(kind).map_or(0, BTreeMap::len))
    }

    /// Number of elements of `kind` accepted by `filter`
    pub fn count_where(&self, kind: ElementKind, filter: impl FnMut(&Element<T>) -> bool + Send + 'static) -> Result<usize> {
        let mut count = 0;
        self.visit_where(kind, filter, |_| count += 1)?;
        Ok(count)
    }

    /// Like iterating `elements_where`, but lock failures are returned
    /// instead of ending the walk early
    fn visit_where(
        &self,
        kind: ElementKind,
        mut filter: impl FnMut(&Element<T>) -> bool,
        mut visit: impl FnMut(Element<T>),
    ) -> Result<()> {
        for id in self.select_ids(kind, Selection::All)? {
            match self.element_by_id(kind, &id)? {
                Some(element) if filter(&element) => visit(element),
                _ => {}
            }
        }
        Ok(())
    }

    fn select_ids(&self, kind: ElementKind, selection: Selection<T>) -> Result<Vec<T::Id>> {
        if let Selection::Ids(ids) = selection {
            return Ok(ids);
        }
        let store = self.read()?;
        let Some(arena) = store.arena(kind) else {
            return Ok(Vec::new());
        };
        Ok(match selection {
            Selection::Labels(labels) => arena
                .values()
                .filter(|element| labels.contains(element.label()))
                .map(|element| element.id().clone())
                .collect(),
            _ => arena.keys().cloned().collect(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Adjacency
    // ─────────────────────────────────────────────────────────────────────────

    /// Edges incident to `vertex` in `direction`; empty for an unknown vertex
    pub fn edges_of(&self, vertex: &T::Id, direction: Direction) -> Result<Elements<T>> {
        let ids = self.incident_ids(vertex, |adjacency| match direction {
            Direction::Outgoing => adjacency.out_edges.iter().cloned().collect(),
            Direction::Incoming => adjacency.in_edges.iter().cloned().collect(),
            Direction::Both => adjacency
                .out_edges
                .iter()
                .chain(adjacency.in_edges.iter())
                .cloned()
                .collect(),
        })?;
        Ok(self.elements_by_id(ElementKind::Edge, ids))
    }

    pub fn out_edges_of(&self, vertex: &T::Id) -> Result<Elements<T>> {
        self.edges_of(vertex, Direction::Outgoing)
    }

    pub fn in_edges_of(&self, vertex: &T::Id) -> Result<Elements<T>> {
        self.edges_of(vertex, Direction::Incoming)
    }

    /// Multiedges leaving (`Outgoing`) or arriving at (`Incoming`) `vertex`
    pub fn multi_edges_of(&self, vertex: &T::Id, direction: Direction) -> Result<Elements<T>> {
        let ids = self.incident_ids(vertex, |adjacency| match direction {
            Direction::Outgoing => adjacency.out_multi_edges.iter().cloned().collect(),
            Direction::Incoming => adjacency.in_multi_edges.iter().cloned().collect(),
            Direction::Both => adjacency
                .out_multi_edges
                .union(&adjacency.in_multi_edges)
                .cloned()
                .collect(),
        })?;
        Ok(self.elements_by_id(ElementKind::MultiEdge, ids))
    }

    pub fn hyper_edges_of(&self, vertex: &T::Id) -> Result<Elements<T>> {
        let ids = self.incident_ids(vertex, |adjacency| adjacency.hyper_edges.iter().cloned().collect())?;
        Ok(self.elements_by_id(ElementKind::HyperEdge, ids))
    }

    /// Vertices one edge away from `vertex`. A vertex reachable over several
    /// edges is yielded once per edge.
    pub fn adjacent_vertices(&self, vertex: &T::Id, direction: Direction) -> Result<Elements<T>> {
        let ids = {
            let store = self.read()?;
            let Some(adjacency) = store.vertices.get(vertex).and_then(|v| v.adjacency()) else {
                return Ok(self.elements_by_id(ElementKind::Vertex, Vec::new()));
            };
            let mut ids = Vec::new();
            if direction != Direction::Incoming {
                ids.extend(
                    adjacency
                        .out_edges
                        .iter()
                        .filter_map(|e| store.edges.get(e))
                        .filter_map(|e| e.in_vertex().cloned()),
                );
            }
            if direction != Direction::Outgoing {
                ids.extend(
                    adjacency
                        .in_edges
                        .iter()
                        .filter_map(|e| store.edges.get(e))
                        .filter_map(|e| e.out_vertex().cloned()),
                );
            }
            ids
        };
        Ok(self.elements_by_id(ElementKind::Vertex, ids))
    }

    fn incident_ids(
        &self,
        vertex: &T::Id,
        select: impl FnOnce(&Adjacency<T::Id>) -> Vec<T::Id>,
    ) -> Result<Vec<T::Id>> {
        let store = self.read()?;
        Ok(store
            .vertices
            .get(vertex)
            .and_then(|v| v.adjacency())
            .map(select)
            .unwrap_or_default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Removal
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove elements by id, skipping unknown ids. Returns every removed
    /// element, including those removed by vertex cascades.
    pub fn remove_by_id(&self, kind: ElementKind, ids: impl IntoIterator<Item = T::Id>) -> Result<Vec<Element<T>>> {
        self.kind_config(kind)?;
        let mut removed = Vec::new();
        {
            let mut store = self.write()?;
            if store.shut_down {
                return Err(Error::ShutDown);
            }
            for id in ids {
                store.remove(kind, &id, &mut removed);
            }
        }
        tracing::debug!("Removed {} elements starting from {}s", removed.len(), kind);
        Ok(removed)
    }

    /// Remove the given elements, whatever their kinds
    pub fn remove_elements<'a>(&self, elements: impl IntoIterator<Item = &'a Element<T>>) -> Result<Vec<Element<T>>>
    where
        T: 'a,
    {
        let targets: Vec<(ElementKind, T::Id)> = elements
            .into_iter()
            .map(|element| (element.kind(), element.id().clone()))
            .collect();
        if let Some((kind, _)) = targets.iter().find(|(kind, _)| *kind == ElementKind::Graph) {
            return Err(Error::Unsupported(format!("{} elements cannot be removed", kind)));
        }

        let mut removed = Vec::new();
        {
            let mut store = self.write()?;
            if store.shut_down {
                return Err(Error::ShutDown);
            }
            for (kind, id) in &targets {
                store.remove(*kind, id, &mut removed);
            }
        }
        tracing::debug!("Removed {} elements", removed.len());
        Ok(removed)
    }

    /// Remove every element of `kind` accepted by `filter`
    pub fn remove_where(
        &self,
        kind: ElementKind,
        filter: impl FnMut(&Element<T>) -> bool + Send + 'static,
    ) -> Result<Vec<Element<T>>> {
        self.kind_config(kind)?;
        let mut doomed = Vec::new();
        self.visit_where(kind, filter, |element| doomed.push(element.id().clone()))?;
        self.remove_by_id(kind, doomed)
    }

    /// Empty all four arenas. A shut-down graph accepts mutations again
    /// afterwards; the graph's own properties are kept.
    pub fn clear(&self) -> Result<()> {
        let mut store = self.write()?;
        store.clear();
        store.shut_down = false;
        tracing::debug!("Cleared graph {:?}", self.id());
        Ok(())
    }

    /// Fire the shutting-down hooks, drop every element, refuse further
    /// mutation, then fire the shut-down hooks. Calling it again is a no-op.
    pub fn shutdown(&self, reason: &str) -> Result<()> {
        if self.is_shut_down()? {
            tracing::debug!("Graph {:?} is already shut down", self.id());
            return Ok(());
        }

        let shutting_down = self.hooks()?.shutting_down();
        hooks::run_shutdown(&shutting_down, reason);

        {
            let mut store = self.write()?;
            store.clear();
            store.shut_down = true;
        }
        tracing::info!("Graph {:?} shut down: {}", self.id(), reason);

        let shut_down = self.hooks()?.shut_down();
        hooks::run_shutdown(&shut_down, reason);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    /// Current value of one property; `None` when the element or key is absent
    pub fn property(&self, target: &ElementRef<T::Id>, key: &T::Key) -> Result<Option<T::Value>> {
        Ok(self
            .read()?
            .element(target)
            .and_then(|element| element.property(key))
            .cloned())
    }

    /// Create or replace a property, returning the previous value
    pub fn set_property(&self, target: &ElementRef<T::Id>, key: T::Key, value: T::Value) -> Result<Option<T::Value>> {
        self.mutate_properties(target, |bag, gate| bag.set_observed(key, value, gate))
    }

    /// Remove a property, returning its value if it was present
    pub fn remove_property(&self, target: &ElementRef<T::Id>, key: &T::Key) -> Result<Option<T::Value>> {
        self.mutate_properties(target, |bag, gate| bag.remove_observed(key, gate))
    }

    /// Remove a property only while it still holds `value`
    pub fn remove_property_matching(
        &self,
        target: &ElementRef<T::Id>,
        key: &T::Key,
        value: &T::Value,
    ) -> Result<Option<T::Value>> {
        self.mutate_properties(target, |bag, gate| bag.remove_matching_observed(key, value, gate))
    }

    /// Remove every property accepted by `filter`; all or nothing
    pub fn remove_properties_where(
        &self,
        target: &ElementRef<T::Id>,
        filter: impl FnMut(&T::Key, &T::Value) -> bool,
    ) -> Result<Vec<(T::Key, T::Value)>> {
        self.mutate_properties(target, |bag, gate| bag.remove_where_observed(filter, gate))
    }

    /// Apply `mutate` to a detached copy of the target's bag, then commit it
    /// if the element has been neither replaced nor revised in the meantime.
    fn mutate_properties<R>(
        &self,
        target: &ElementRef<T::Id>,
        mutate: impl FnOnce(&mut PropertyBag<T::Key, T::Value>, &ChangeGate<'_, T>) -> Result<R>,
    ) -> Result<R> {
        let (mut bag, revision, epoch) = {
            let store = self.read()?;
            if store.shut_down {
                return Err(Error::ShutDown);
            }
            let element = store.element(target).ok_or_else(|| missing(target))?;
            (element.properties().clone(), element.revision().clone(), element.epoch())
        };

        let changing = self.hooks()?.property_changing();
        let gate = ChangeGate::new(target, &changing);
        let result = mutate(&mut bag, &gate)?;
        let applied = gate.into_applied();
        if applied.is_empty() {
            return Ok(result);
        }

        {
            let mut store = self.write()?;
            if store.shut_down {
                return Err(Error::ShutDown);
            }
            let element = store.element_mut(target).ok_or_else(|| missing(target))?;
            // A removed and re-added element restarts its revisions
            if element.epoch() != epoch || *element.revision() != revision {
                tracing::warn!("Property commit on {} lost a race with another writer", target);
                return Err(Error::RevisionConflict {
                    target: target.to_string(),
                });
            }
            *element.properties_mut() = bag;
            element.set_revision(self.inner.config.next_revision(Some(&revision)));
        }
        tracing::trace!("Committed {} property changes on {}", applied.len(), target);

        let changed = self.hooks()?.property_changed();
        for (key, old, new) in &applied {
            let change = PropertyChange {
                key,
                old: old.as_ref(),
                new: new.as_ref(),
            };
            hooks::run_property_changed::<T>(&changed, target, &change);
        }
        Ok(result)
    }
}

fn missing<Id: std::fmt::Debug>(target: &ElementRef<Id>) -> Error {
    match target.id() {
        Some(id) => Error::unknown(target.kind(), id),
        None => Error::Internal("graph element missing".to_string()),
    }
}

type ElementFilter<T> = Box<dyn FnMut(&Element<T>) -> bool + Send>;

enum Selection<T: GraphTypes> {
    All,
    Ids(Vec<T::Id>),
    Labels(BTreeSet<T::Label>),
}

/// A lazy sequence of element snapshots.
///
/// Nothing is read from the graph until the first call to `next`, which
/// snapshots the matching ids. Each id is then resolved on demand; ids whose
/// element has been removed since are skipped.
pub struct Elements<T: GraphTypes> {
    graph: PropertyGraph<T>,
    kind: ElementKind,
    selection: Option<Selection<T>>,
    filter: Option<ElementFilter<T>>,
    pending: std::vec::IntoIter<T::Id>,
}

impl<T: GraphTypes> Elements<T> {
    fn new(graph: PropertyGraph<T>, kind: ElementKind, selection: Selection<T>, filter: Option<ElementFilter<T>>) -> Self {
        Self {
            graph,
            kind,
            selection: Some(selection),
            filter,
            pending: Vec::new().into_iter(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The graph this sequence reads from
    pub fn graph(&self) -> &PropertyGraph<T> {
        &self.graph
    }
}

impl<T: GraphTypes> Iterator for Elements<T> {
    type Item = Element<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(selection) = self.selection.take() {
            match self.graph.select_ids(self.kind, selection) {
                Ok(ids) => self.pending = ids.into_iter(),
                Err(e) => {
                    tracing::error!("Failed to enumerate {} elements: {}", self.kind, e);
                    return None;
                }
            }
        }

        loop {
            let id = self.pending.next()?;
            let element = match self.graph.element_by_id(self.kind, &id) {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("Failed to resolve {} {:?}: {}", self.kind, id, e);
                    self.pending = Vec::new().into_iter();
                    return None;
                }
            };
            if let Some(filter) = self.filter.as_mut() {
                if !filter(&element) {
                    continue;
                }
            }
            return Some(element);
        }
    }
}

impl<T: GraphTypes> std::fmt::Debug for Elements<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Elements")
            .field("kind", &self.kind)
            .field("started", &self.selection.is_none())
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}
