//! Graph construction settings, id generators and revision policies

use crate::error::Result;
use crate::graph::PropertyGraph;
use crate::types::{DefaultTypes, ElementKind, GraphTypes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use ulid::Ulid;

/// Produces a fresh identifier for a new element
pub type IdGenerator<Id> = Arc<dyn Fn() -> Id + Send + Sync>;

/// Produces the next revision from the current one (`None` for a new element)
pub type RevisionPolicy<R> = Arc<dyn Fn(Option<&R>) -> R + Send + Sync>;

/// Invoked once, right after a graph is constructed
pub type Initializer<T> = Arc<dyn Fn(&PropertyGraph<T>) -> Result<()> + Send + Sync>;

/// Names used for the id, revision and label when an element is flattened
/// into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNames {
    #[serde(default = "default_id_key")]
    pub id: String,
    #[serde(default = "default_revision_key")]
    pub revision: String,
    #[serde(default = "default_label_key")]
    pub label: String,
}

fn default_id_key() -> String {
    "Id".to_string()
}

fn default_revision_key() -> String {
    "RevId".to_string()
}

fn default_label_key() -> String {
    "Label".to_string()
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            id: default_id_key(),
            revision: default_revision_key(),
            label: default_label_key(),
        }
    }
}

/// How identifiers are generated when an Add call supplies none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Lexicographically sortable ULID strings
    #[default]
    Ulid,
    /// Per-kind counters with a one-letter prefix (`v1`, `e1`, `m1`, `h1`)
    Sequential,
}

/// Serializable per-kind settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSettings {
    #[serde(default)]
    pub keys: KeyNames,
    pub default_label: String,
}

impl KindSettings {
    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            keys: KeyNames::default(),
            default_label: default_label.into(),
        }
    }
}

/// Serializable graph settings (loadable from a TOML config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Graph id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,

    #[serde(default = "default_graph_label")]
    pub graph_label: String,

    #[serde(default)]
    pub id_strategy: IdStrategy,

    #[serde(default = "default_vertex_settings")]
    pub vertex: KindSettings,

    #[serde(default = "default_edge_settings")]
    pub edge: KindSettings,

    #[serde(default = "default_multi_edge_settings")]
    pub multi_edge: KindSettings,

    #[serde(default = "default_hyper_edge_settings")]
    pub hyper_edge: KindSettings,
}

fn default_graph_label() -> String {
    "graph".to_string()
}

fn default_vertex_settings() -> KindSettings {
    KindSettings::new("vertex")
}

fn default_edge_settings() -> KindSettings {
    KindSettings::new("edge")
}

fn default_multi_edge_settings() -> KindSettings {
    KindSettings::new("multiedge")
}

fn default_hyper_edge_settings() -> KindSettings {
    KindSettings::new("hyperedge")
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            graph_id: None,
            graph_label: default_graph_label(),
            id_strategy: IdStrategy::default(),
            vertex: default_vertex_settings(),
            edge: default_edge_settings(),
            multi_edge: default_multi_edge_settings(),
            hyper_edge: default_hyper_edge_settings(),
        }
    }
}

impl GraphSettings {
    pub fn kind(&self, kind: ElementKind) -> Option<&KindSettings> {
        match kind {
            ElementKind::Vertex => Some(&self.vertex),
            ElementKind::Edge => Some(&self.edge),
            ElementKind::MultiEdge => Some(&self.multi_edge),
            ElementKind::HyperEdge => Some(&self.hyper_edge),
            ElementKind::Graph => None,
        }
    }
}

/// Runtime configuration of one element kind
pub struct KindConfig<T: GraphTypes> {
    pub keys: KeyNames,
    pub default_label: T::Label,
    pub id_generator: IdGenerator<T::Id>,
}

impl<T: GraphTypes> Clone for KindConfig<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            default_label: self.default_label.clone(),
            id_generator: self.id_generator.clone(),
        }
    }
}

/// Everything a [`PropertyGraph`] needs at construction time
pub struct GraphConfig<T: GraphTypes> {
    pub(crate) graph_id: T::Id,
    pub(crate) graph_label: T::Label,
    pub(crate) vertex: KindConfig<T>,
    pub(crate) edge: KindConfig<T>,
    pub(crate) multi_edge: KindConfig<T>,
    pub(crate) hyper_edge: KindConfig<T>,
    pub(crate) revisions: RevisionPolicy<T::Revision>,
    pub(crate) initializer: Option<Initializer<T>>,
}

impl<T: GraphTypes> GraphConfig<T> {
    /// Every kind starts with the same id generator and default label;
    /// override per kind with the `with_*` methods.
    pub fn new(
        graph_id: T::Id,
        graph_label: T::Label,
        ids: IdGenerator<T::Id>,
        default_label: T::Label,
        revisions: RevisionPolicy<T::Revision>,
    ) -> Self {
        let kind = KindConfig {
            keys: KeyNames::default(),
            default_label,
            id_generator: ids,
        };
        Self {
            graph_id,
            graph_label,
            vertex: kind.clone(),
            edge: kind.clone(),
            multi_edge: kind.clone(),
            hyper_edge: kind,
            revisions,
            initializer: None,
        }
    }

    pub fn with_id_generator(mut self, kind: ElementKind, ids: IdGenerator<T::Id>) -> Self {
        if let Some(config) = self.kind_mut(kind) {
            config.id_generator = ids;
        }
        self
    }

    pub fn with_default_label(mut self, kind: ElementKind, label: T::Label) -> Self {
        if let Some(config) = self.kind_mut(kind) {
            config.default_label = label;
        }
        self
    }

    pub fn with_keys(mut self, kind: ElementKind, keys: KeyNames) -> Self {
        if let Some(config) = self.kind_mut(kind) {
            config.keys = keys;
        }
        self
    }

    pub fn with_initializer(
        mut self,
        initializer: impl Fn(&PropertyGraph<T>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    /// Per-kind configuration; `None` for [`ElementKind::Graph`]
    pub fn kind(&self, kind: ElementKind) -> Option<&KindConfig<T>> {
        match kind {
            ElementKind::Vertex => Some(&self.vertex),
            ElementKind::Edge => Some(&self.edge),
            ElementKind::MultiEdge => Some(&self.multi_edge),
            ElementKind::HyperEdge => Some(&self.hyper_edge),
            ElementKind::Graph => None,
        }
    }

    fn kind_mut(&mut self, kind: ElementKind) -> Option<&mut KindConfig<T>> {
        match kind {
            ElementKind::Vertex => Some(&mut self.vertex),
            ElementKind::Edge => Some(&mut self.edge),
            ElementKind::MultiEdge => Some(&mut self.multi_edge),
            ElementKind::HyperEdge => Some(&mut self.hyper_edge),
            ElementKind::Graph => None,
        }
    }

    pub(crate) fn next_revision(&self, current: Option<&T::Revision>) -> T::Revision {
        (self.revisions)(current)
    }
}

impl GraphConfig<DefaultTypes> {
    /// Build a configuration for string-keyed graphs from serializable settings
    pub fn from_settings(settings: &GraphSettings) -> Self {
        let kind_config = |kind: ElementKind, s: &KindSettings| KindConfig {
            keys: s.keys.clone(),
            default_label: s.default_label.clone(),
            id_generator: match settings.id_strategy {
                IdStrategy::Ulid => ulid_ids(),
                IdStrategy::Sequential => prefixed_sequential_ids(sequence_prefix(kind)),
            },
        };

        Self {
            graph_id: settings
                .graph_id
                .clone()
                .unwrap_or_else(|| Ulid::new().to_string()),
            graph_label: settings.graph_label.clone(),
            vertex: kind_config(ElementKind::Vertex, &settings.vertex),
            edge: kind_config(ElementKind::Edge, &settings.edge),
            multi_edge: kind_config(ElementKind::MultiEdge, &settings.multi_edge),
            hyper_edge: kind_config(ElementKind::HyperEdge, &settings.hyper_edge),
            revisions: counter_revisions(),
            initializer: None,
        }
    }
}

impl Default for GraphConfig<DefaultTypes> {
    fn default() -> Self {
        Self::from_settings(&GraphSettings::default())
    }
}

fn sequence_prefix(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Vertex => "v",
        ElementKind::Edge => "e",
        ElementKind::MultiEdge => "m",
        ElementKind::HyperEdge => "h",
        ElementKind::Graph => "g",
    }
}

/// ULID strings
pub fn ulid_ids() -> IdGenerator<String> {
    Arc::new(|| Ulid::new().to_string())
}

/// `1, 2, 3, ...` from an atomic counter
pub fn sequential_ids() -> IdGenerator<u64> {
    let counter = Arc::new(AtomicU64::new(0));
    Arc::new(move || counter.fetch_add(1, Ordering::Relaxed) + 1)
}

/// `{prefix}1, {prefix}2, ...`
pub fn prefixed_sequential_ids(prefix: impl Into<String>) -> IdGenerator<String> {
    let prefix = prefix.into();
    let counter = Arc::new(AtomicU64::new(0));
    Arc::new(move || format!("{}{}", prefix, counter.fetch_add(1, Ordering::Relaxed) + 1))
}

/// Revisions `1, 2, 3, ...`
pub fn counter_revisions() -> RevisionPolicy<u64> {
    Arc::new(|current| current.map_or(1, |r| r + 1))
}

/// Wall-clock revisions, strictly increasing even when the clock stalls
pub fn timestamp_revisions() -> RevisionPolicy<DateTime<Utc>> {
    Arc::new(|current| {
        let now = Utc::now();
        match current {
            Some(previous) if *previous >= now => *previous + chrono::Duration::nanoseconds(1),
            _ => now,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_generators() {
        let ids = sequential_ids();
        assert_eq!((ids(), ids(), ids()), (1, 2, 3));

        let named = prefixed_sequential_ids("v");
        assert_eq!(named(), "v1");
        assert_eq!(named(), "v2");
    }

    #[test]
    fn test_revision_policies_increase() {
        let counter = counter_revisions();
        assert_eq!(counter(None), 1);
        assert_eq!(counter(Some(&41)), 42);

        let clock = timestamp_revisions();
        let first = clock(None);
        let far_future = first + chrono::Duration::days(1);
        assert!(clock(Some(&far_future)) > far_future);
    }

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: GraphSettings =
            serde_json::from_str(r#"{ "id_strategy": "sequential", "edge": { "default_label": "link" } }"#)
                .unwrap();

        assert_eq!(settings.id_strategy, IdStrategy::Sequential);
        assert_eq!(settings.edge.default_label, "link");
        assert_eq!(settings.edge.keys, KeyNames::default());
        assert_eq!(settings.vertex.default_label, "vertex");
        assert_eq!(settings.graph_label, "graph");
    }

    #[test]
    fn test_from_settings_uses_prefixed_ids() {
        let settings = GraphSettings {
            id_strategy: IdStrategy::Sequential,
            ..Default::default()
        };
        let config = GraphConfig::from_settings(&settings);

        let vertex_ids = &config.kind(ElementKind::Vertex).unwrap().id_generator;
        let edge_ids = &config.kind(ElementKind::Edge).unwrap().id_generator;
        assert_eq!(vertex_ids(), "v1");
        assert_eq!(edge_ids(), "e1");
        assert!(config.kind(ElementKind::Graph).is_none());
    }
}
