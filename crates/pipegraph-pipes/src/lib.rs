//! Pipegraph Pipes - Lazy traversal pipelines
//!
//! A pipe is a pull-based, restartable external iterator. Pipes are wired
//! source to sink, nothing runs until the last one is advanced, and every
//! produced value can report the [`Path`] that led to it.
//!
//! ```ignore
//! let knows = connect(ElementsPipe::vertices(&graph), out(&graph, ["knows".to_string()]));
//! let names = connect(knows, property("name".to_string()));
//! for name in Pipeline::new(names) { println!("{name}"); }
//! ```

pub mod cursor;
pub mod error;
pub mod filter;
pub mod meta;
pub mod path;
pub mod pipe;
pub mod side_effect;
pub mod steps;
pub mod zip;

pub use cursor::{Cursor, IterCursor, Item, Source, VecCursor};
pub use error::{PipeError, PipeResult};
pub use filter::{
    compare_objects, label_filter, object_filter, property_filter, Comparison, ComparisonFilterPipe,
    DuplicateFilterPipe, FilterPipe, LabelFilterPipe, ObjectFilterPipe, PropertyFilterPipe, RangeFilterPipe,
};
pub use meta::{MetaPipe, MetaPipeBuilder, Stage};
pub use path::{Path, PathEntry, PathItem};
pub use pipe::{connect, FlatMapPipe, IdentityPipe, MapPipe, Pipe, Pipeline};
pub use side_effect::{AggregatePipe, ConsumePipe, CountPipe, Extrema, ExtremaPipe, GroupCountPipe, SideEffectPipe};
pub use steps::{EdgesPipe, ElementsPipe, HyperEdgesPipe, MultiEdgesPipe, Step, VerticesPipe};
pub use zip::{ZipPipe2, ZipPipe3, ZipPipe4, ZipPipe5};
