//! Stats command

use std::collections::BTreeMap;

use pipegraph_core::{DefaultTypes, Element, ElementKind};
use pipegraph_pipes::{Cursor, ElementsPipe, GroupCountPipe, Pipe, SideEffectPipe, Source};
use serde::Serialize;

use crate::output::{format_table, to_json, OutputFormat};
use crate::AppContext;

const KINDS: [ElementKind; 4] = [
    ElementKind::Vertex,
    ElementKind::Edge,
    ElementKind::MultiEdge,
    ElementKind::HyperEdge,
];

#[derive(Debug, Serialize)]
struct KindStats {
    kind: ElementKind,
    count: usize,
    labels: BTreeMap<String, u64>,
}

pub fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let mut stats = Vec::new();
    for kind in KINDS {
        let mut labels = GroupCountPipe::new(|element: &Element<DefaultTypes>| element.label().clone());
        labels.set_source(Source::cursor(ElementsPipe::new(&ctx.graph, kind)));
        while labels.move_next() {}

        stats.push(KindStats {
            kind,
            count: ctx.graph.count(kind)?,
            labels: labels.side_effect().clone(),
        });
    }
    tracing::info!("Collected stats for {} element kinds", stats.len());

    match ctx.format {
        OutputFormat::Json => println!("{}", to_json(&stats)),
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = stats
                .iter()
                .map(|s| {
                    let labels = s
                        .labels
                        .iter()
                        .map(|(label, n)| format!("{}={}", label, n))
                        .collect::<Vec<_>>()
                        .join(", ");
                    vec![s.kind.to_string(), s.count.to_string(), labels]
                })
                .collect();
            println!("{}", format_table(&["kind", "count", "labels"], &rows));
        }
    }
    Ok(())
}
