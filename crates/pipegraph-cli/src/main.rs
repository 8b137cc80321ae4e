//! Pipegraph CLI - Query property graph snapshots from the command line

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, config as config_cmd, stats, vertices, walk};
use config::CliConfig;
use output::OutputFormat;
use pipegraph_core::{GraphSnapshot, PropertyGraph};

#[derive(Parser)]
#[command(name = "pipegraph")]
#[command(author, version, about = "Traverse in-memory property graphs")]
pub struct Cli {
    /// Graph snapshot (JSON) to load
    #[arg(short, long, env = "PIPEGRAPH_GRAPH", global = true)]
    pub graph: Option<PathBuf>,

    /// Output format: table, json
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count elements per kind and label
    Stats,
    /// List vertices, optionally filtered by label or property
    Vertices(vertices::VerticesArgs),
    /// Walk the graph step by step from a set of vertices
    Walk(walk::WalkArgs),
    /// Print the loaded graph back as a normalized snapshot
    Export,
    /// Manage CLI configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Loaded configuration and graph shared by the graph commands
pub struct AppContext {
    pub config: CliConfig,
    pub graph: PropertyGraph,
    pub format: OutputFormat,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: CliConfig) -> anyhow::Result<Self> {
        let path = cli
            .graph
            .clone()
            .or_else(|| config.default_graph.clone())
            .context("No graph given; pass --graph or set default_graph in the config file")?;
        tracing::debug!("Loading graph snapshot from: {:?}", path);

        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let snapshot = GraphSnapshot::from_json(&json)
            .with_context(|| format!("Invalid graph snapshot in {}", path.display()))?;

        let graph = PropertyGraph::from_settings(&config.graph)?;
        let records = snapshot.len();
        snapshot.restore_into(&graph)?;
        tracing::info!("Loaded {} records from {}", records, path.display());

        let format = OutputFormat::from(cli.format.as_deref().unwrap_or(&config.default_format));
        Ok(Self { config, graph, format })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting pipegraph CLI");

    match &cli.command {
        Commands::Config(args) => return config_cmd::run(args),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let config = CliConfig::load()?;
    let ctx = AppContext::new(&cli, config).await?;

    match &cli.command {
        Commands::Stats => stats::run(&ctx)?,
        Commands::Vertices(args) => vertices::run(args, &ctx)?,
        Commands::Walk(args) => walk::run(args, &ctx)?,
        Commands::Export => println!("{}", ctx.graph.snapshot()?.to_json_pretty()?),
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    ctx.graph.shutdown("command finished")?;
    Ok(())
}
