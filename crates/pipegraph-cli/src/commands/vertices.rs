//! Vertex listing command

use anyhow::Context;
use clap::Args;

use pipegraph_core::{DefaultTypes, Element, Value};
use pipegraph_pipes::{connect, property_filter, Comparison, Cursor, ElementsPipe, Pipeline, RangeFilterPipe};

use crate::output::{format_table, to_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct VerticesArgs {
    /// Only vertices with one of these labels
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Property condition such as "age >= 18" or "name=alice"
    #[arg(short = 'w', long = "where")]
    pub condition: Option<String>,

    /// Skip this many matches
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Maximum number of vertices
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// A parsed `key <op> value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: String,
    pub comparison: Comparison,
    pub value: Value,
}

const OPERATORS: [&str; 7] = [">=", "<=", "!=", "==", ">", "<", "="];

/// Parse `key op value`, with or without spaces around the operator
pub fn parse_condition(input: &str) -> anyhow::Result<Condition> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let (key, op, value) = match tokens.as_slice() {
        [key, op, value] => (*key, *op, *value),
        _ => {
            let (at, op) = OPERATORS
                .iter()
                .filter_map(|op| input.find(op).map(|at| (at, *op)))
                .min_by_key(|(at, op)| (*at, std::cmp::Reverse(op.len())))
                .with_context(|| format!("No comparison operator in condition '{}'", input))?;
            (input[..at].trim(), op, input[at + op.len()..].trim())
        }
    };

    if key.is_empty() {
        anyhow::bail!("Missing property name in condition '{}'", input);
    }
    let comparison =
        Comparison::from_symbol(op).with_context(|| format!("Unknown comparison operator '{}'", op))?;
    Ok(Condition {
        key: key.to_string(),
        comparison,
        value: Value::parse_literal(value),
    })
}

pub fn run(args: &VerticesArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut root = ElementsPipe::vertices(&ctx.graph);
    if !args.label.is_empty() {
        root = root.with_labels(args.label.iter().cloned());
    }

    let mut matches: Box<dyn Cursor<Element<DefaultTypes>>> = Box::new(root);
    if let Some(condition) = &args.condition {
        let condition = parse_condition(condition)?;
        tracing::debug!("Filtering vertices on {:?}", condition);
        matches = Box::new(connect(
            matches,
            property_filter::<DefaultTypes>(condition.key, condition.comparison, condition.value),
        ));
    }
    let window = RangeFilterPipe::new(args.offset, args.limit.map(|limit| args.offset + limit));
    let vertices: Vec<_> = Pipeline::new(connect(matches, window)).collect();
    tracing::info!("Found {} vertices", vertices.len());

    match ctx.format {
        OutputFormat::Json => {
            let keys = &ctx.config.graph.vertex.keys;
            let records = vertices
                .iter()
                .map(|v| v.to_record(keys))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", to_json(&records));
        }
        OutputFormat::Table => {
            if vertices.is_empty() {
                println!("No vertices found");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = vertices
                .iter()
                .map(|v| {
                    let mut properties: Vec<String> =
                        v.properties().iter().map(|(k, value)| format!("{}={}", k, value)).collect();
                    properties.sort();
                    vec![v.id().clone(), v.label().clone(), properties.join(", ")]
                })
                .collect();
            println!("{}", format_table(&["id", "label", "properties"], &rows));
        }
    }
    Ok(())
}
