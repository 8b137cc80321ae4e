//! Walk command: compose traversal steps into a single pipe

use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use pipegraph_core::{DefaultTypes, Element, PropertyGraph};
use pipegraph_pipes::{
    connect, steps, Cursor, DuplicateFilterPipe, ElementsPipe, IdentityPipe, MetaPipe, Path, Pipe, RangeFilterPipe,
    Source,
};

use crate::output::{format_table, to_json, OutputFormat};
use crate::AppContext;

type GraphElement = Element<DefaultTypes>;

#[derive(Args)]
pub struct WalkArgs {
    /// Start vertex ids; all vertices when omitted
    #[arg(long)]
    pub from: Vec<String>,

    /// Steps applied in order: out, in, both, out-edges, in-edges,
    /// both-edges, out-vertex, in-vertex. Adjacency steps accept edge
    /// labels after a colon, e.g. out:knows,likes
    #[arg(short, long)]
    pub step: Vec<String>,

    /// Drop elements already produced
    #[arg(long)]
    pub dedup: bool,

    /// Print what to emit for each result: id, label or property:<key>
    #[arg(short, long, default_value = "id")]
    pub emit: String,

    /// Include the path leading to each result
    #[arg(long)]
    pub path: bool,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// One traversal step as written on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSpec {
    Out(Vec<String>),
    In(Vec<String>),
    Both(Vec<String>),
    OutEdges(Vec<String>),
    InEdges(Vec<String>),
    BothEdges(Vec<String>),
    OutVertex,
    InVertex,
}

impl FromStr for StepSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (name, labels) = match s.split_once(':') {
            Some((name, labels)) => (
                name,
                labels
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            None => (s, Vec::new()),
        };
        let name = name.trim();
        if matches!(name, "out-vertex" | "outV" | "in-vertex" | "inV") && !labels.is_empty() {
            anyhow::bail!("Step '{}' does not take labels", name);
        }
        Ok(match name {
            "out" => Self::Out(labels),
            "in" => Self::In(labels),
            "both" => Self::Both(labels),
            "out-edges" | "outE" => Self::OutEdges(labels),
            "in-edges" | "inE" => Self::InEdges(labels),
            "both-edges" | "bothE" => Self::BothEdges(labels),
            "out-vertex" | "outV" => Self::OutVertex,
            "in-vertex" | "inV" => Self::InVertex,
            other => anyhow::bail!("Unknown step '{}'", other),
        })
    }
}

impl StepSpec {
    fn into_pipe(self, graph: &PropertyGraph) -> Box<dyn Pipe<GraphElement, GraphElement>> {
        match self {
            Self::Out(labels) => Box::new(steps::out(graph, labels)),
            Self::In(labels) => Box::new(steps::in_(graph, labels)),
            Self::Both(labels) => Box::new(steps::both(graph, labels)),
            Self::OutEdges(labels) => Box::new(steps::out_edges(graph, labels)),
            Self::InEdges(labels) => Box::new(steps::in_edges(graph, labels)),
            Self::BothEdges(labels) => Box::new(steps::both_edges(graph, labels)),
            Self::OutVertex => Box::new(steps::out_vertex(graph)),
            Self::InVertex => Box::new(steps::in_vertex(graph)),
        }
    }
}

/// What each result is printed as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    Id,
    Label,
    Property(String),
}

impl FromStr for Emit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.split_once(':') {
            Some(("property", key)) if !key.is_empty() => Ok(Self::Property(key.to_string())),
            None if s == "id" => Ok(Self::Id),
            None if s == "label" => Ok(Self::Label),
            _ => anyhow::bail!("Cannot emit '{}'; use id, label or property:<key>", s),
        }
    }
}

impl Emit {
    fn render(&self, element: &GraphElement) -> Option<serde_json::Value> {
        match self {
            Self::Id => Some(serde_json::Value::String(element.id().clone())),
            Self::Label => Some(serde_json::Value::String(element.label().clone())),
            Self::Property(key) => element
                .property(key)
                .and_then(|value| serde_json::to_value(value).ok()),
        }
    }
}

#[derive(Debug, Serialize)]
struct WalkResult {
    value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<String>>,
}

/// Element ids along a path; other entries are shown as debug text
fn path_ids(path: &Path) -> Vec<String> {
    path.iter()
        .map(|entry| match entry.downcast_ref::<GraphElement>() {
            Some(element) => element.id().clone(),
            None => format!("{:?}", entry),
        })
        .collect()
}

/// Assemble the walk as one cursor over the final elements
pub fn build_walk(args: &WalkArgs, graph: &PropertyGraph) -> anyhow::Result<Box<dyn Cursor<GraphElement>>> {
    let mut root = ElementsPipe::vertices(graph);
    if !args.from.is_empty() {
        root = root.with_ids(args.from.iter().cloned());
    }

    let specs = args
        .step
        .iter()
        .map(|s| s.parse::<StepSpec>())
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut walk: Box<dyn Cursor<GraphElement>> = if specs.is_empty() {
        Box::new(root)
    } else {
        let mut pipes: Vec<Box<dyn Pipe<GraphElement, GraphElement>>> = vec![Box::new(IdentityPipe::<GraphElement>::new())];
        pipes.extend(specs.into_iter().map(|spec| spec.into_pipe(graph)));
        let mut meta = MetaPipe::from_pipes(pipes).context("Invalid step chain")?;
        meta.set_source(Source::cursor(root));
        tracing::debug!("Walk uses {} stages", meta.stages().len());
        Box::new(meta)
    };

    if args.dedup {
        walk = Box::new(connect(walk, DuplicateFilterPipe::new()));
    }
    if let Some(limit) = args.limit {
        walk = Box::new(connect(walk, RangeFilterPipe::new(0, Some(limit))));
    }
    Ok(walk)
}

pub fn run(args: &WalkArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let emit: Emit = args.emit.parse()?;
    let mut walk = build_walk(args, &ctx.graph)?;

    let mut results = Vec::new();
    while walk.move_next() {
        let Some(element) = walk.current() else {
            continue;
        };
        let Some(value) = emit.render(element) else {
            continue;
        };
        let path = args.path.then(|| path_ids(&walk.path()));
        results.push(WalkResult { value, path });
    }
    walk.dispose();
    tracing::info!("Walk produced {} results", results.len());

    match ctx.format {
        OutputFormat::Json => println!("{}", to_json(&results)),
        OutputFormat::Table => {
            let display = |value: &serde_json::Value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if args.path {
                let rows: Vec<Vec<String>> = results
                    .iter()
                    .map(|r| vec![display(&r.value), r.path.clone().unwrap_or_default().join(" -> ")])
                    .collect();
                println!("{}", format_table(&["result", "path"], &rows));
            } else {
                for result in &results {
                    println!("{}", display(&result.value));
                }
            }
        }
    }
    Ok(())
}
