//! Pipegraph Core - In-memory property graph engine
//!
//! This crate provides the data model (vertices, edges, multiedges and
//! hyperedges carrying property bags), the owning [`PropertyGraph`]
//! container with its lifecycle hooks, and snapshot import/export.

pub mod config;
pub mod element;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod properties;
pub mod snapshot;
pub mod types;
pub mod value;

pub use config::{
    counter_revisions, prefixed_sequential_ids, sequential_ids, timestamp_revisions, ulid_ids, GraphConfig,
    GraphSettings, IdGenerator, IdStrategy, KeyNames, KindConfig, KindSettings, RevisionPolicy,
};
pub use element::{Adjacency, Edge, Element, ElementRef, Endpoints, HyperEdge, MultiEdge, Vertex};
pub use error::{Error, Result, Veto};
pub use graph::{Draft, Elements, PropertyGraph};
pub use hooks::GraphEvent;
pub use properties::{ChangeKind, PropertyBag, PropertyChange, PropertyHooks, PropertyObserver, Unobserved};
pub use snapshot::{EdgeRecord, GraphSnapshot, HyperEdgeRecord, MultiEdgeRecord, VertexRecord};
pub use types::{DefaultTypes, Direction, ElementKind, GraphTypes, PropertyKey};
pub use value::Value;
