//! Config command for managing CLI configuration

use clap::{Args, Subcommand};

use crate::config::{config_file_path, CliConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print one setting, e.g. `graph.id_strategy`
    Get {
        /// Setting name
        key: String,
    },
    /// Change one setting and save the file
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// List every setting with its current value
    List,
    /// Show config file path
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => run_get(key),
        ConfigCommands::Set { key, value } => run_set(key, value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(*force),
    }
}

fn run_get(key: &str) -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    let value = config
        .get(key)
        .map_err(|e| anyhow::anyhow!("{}. Known keys: {}", e, CliConfig::keys().join(", ")))?;
    println!("{}", value.unwrap_or_default());
    Ok(())
}

fn run_set(key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} = {}", key, value);
    Ok(())
}

fn run_list() -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    for key in CliConfig::keys() {
        let value = config.get(key)?.unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn run_path() -> anyhow::Result<()> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_show() -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn run_init(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let config = CliConfig::default();
    config.save()?;
    println!("Created config file at {}", path.display());
    Ok(())
}
