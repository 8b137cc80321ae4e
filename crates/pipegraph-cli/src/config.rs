//! CLI configuration

use std::path::PathBuf;

use anyhow::Context;
use pipegraph_core::{GraphSettings, IdStrategy, KindSettings};
use serde::{Deserialize, Serialize};

/// Get default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pipegraph")
}

/// Location of the config file; `PIPEGRAPH_CONFIG` overrides the default
pub fn config_file_path() -> PathBuf {
    std::env::var_os("PIPEGRAPH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_config_dir().join("config.toml"))
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Snapshot loaded when `--graph` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_graph: Option<PathBuf>,

    #[serde(default = "default_format")]
    pub default_format: String,

    /// Construction settings for every loaded graph
    #[serde(default)]
    pub graph: GraphSettings,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_graph: None,
            default_format: default_format(),
            graph: GraphSettings::default(),
        }
    }
}

impl CliConfig {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load() -> anyhow::Result<Self> {
        let path = config_file_path();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_toml()?)?;
        tracing::debug!("Wrote config to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Keys accepted by `get` and `set`
    pub fn keys() -> &'static [&'static str] {
        &KEYS
    }

    /// Value of `key`; `Ok(None)` when the key is known but unset
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(match key {
            "default_graph" => self.default_graph.as_ref().map(|p| p.display().to_string()),
            "default_format" => Some(self.default_format.clone()),
            "graph.id" => self.graph.graph_id.clone(),
            "graph.label" => Some(self.graph.graph_label.clone()),
            "graph.id_strategy" => Some(strategy_name(self.graph.id_strategy).to_string()),
            _ => Some(self.kind_settings(key)?.default_label.clone()),
        })
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "default_graph" => self.default_graph = Some(PathBuf::from(value)),
            "default_format" => match value {
                "table" | "json" => self.default_format = value.to_string(),
                other => anyhow::bail!("Unknown output format '{}'; use table or json", other),
            },
            "graph.id" => self.graph.graph_id = Some(value.to_string()),
            "graph.label" => self.graph.graph_label = value.to_string(),
            "graph.id_strategy" => {
                self.graph.id_strategy = match value {
                    "ulid" => IdStrategy::Ulid,
                    "sequential" => IdStrategy::Sequential,
                    other => anyhow::bail!("Unknown id strategy '{}'; use ulid or sequential", other),
                }
            }
            _ => {
                if value.is_empty() {
                    anyhow::bail!("Default label for '{}' cannot be empty", key);
                }
                self.kind_settings_mut(key)?.default_label = value.to_string();
            }
        }
        Ok(())
    }

    fn kind_settings(&self, key: &str) -> anyhow::Result<&KindSettings> {
        Ok(match key {
            "vertex.default_label" => &self.graph.vertex,
            "edge.default_label" => &self.graph.edge,
            "multi_edge.default_label" => &self.graph.multi_edge,
            "hyper_edge.default_label" => &self.graph.hyper_edge,
            other => anyhow::bail!("Unknown config key '{}'", other),
        })
    }

    fn kind_settings_mut(&mut self, key: &str) -> anyhow::Result<&mut KindSettings> {
        Ok(match key {
            "vertex.default_label" => &mut self.graph.vertex,
            "edge.default_label" => &mut self.graph.edge,
            "multi_edge.default_label" => &mut self.graph.multi_edge,
            "hyper_edge.default_label" => &mut self.graph.hyper_edge,
            other => anyhow::bail!("Unknown config key '{}'", other),
        })
    }
}

const KEYS: [&str; 9] = [
    "default_graph",
    "default_format",
    "graph.id",
    "graph.label",
    "graph.id_strategy",
    "vertex.default_label",
    "edge.default_label",
    "multi_edge.default_label",
    "hyper_edge.default_label",
];

fn strategy_name(strategy: IdStrategy) -> &'static str {
    match strategy {
        IdStrategy::Ulid => "ulid",
        IdStrategy::Sequential => "sequential",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_survive_toml_round_trip() {
        let config = CliConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: CliConfig = toml::from_str(
            r#"
            default_format = "json"

            [graph]
            id_strategy = "sequential"

            [graph.vertex]
            default_label = "node"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.default_format, "json");
        assert_eq!(parsed.graph.id_strategy, IdStrategy::Sequential);
        assert_eq!(parsed.graph.vertex.default_label, "node");
        assert_eq!(parsed.graph.edge.default_label, "edge");
        assert!(parsed.default_graph.is_none());
    }

    #[test]
    fn test_get_and_set_keys() {
        let mut config = CliConfig::default();
        assert_eq!(config.get("default_graph").unwrap(), None);
        assert_eq!(config.get("graph.id_strategy").unwrap().as_deref(), Some("ulid"));

        config.set("default_graph", "/tmp/g.json").unwrap();
        config.set("graph.id_strategy", "sequential").unwrap();
        config.set("edge.default_label", "link").unwrap();

        assert_eq!(config.get("default_graph").unwrap().as_deref(), Some("/tmp/g.json"));
        assert_eq!(config.graph.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.graph.edge.default_label, "link");
        for key in CliConfig::keys() {
            assert!(config.get(key).is_ok(), "{key} should be readable");
        }
    }

    #[test]
    fn test_rejects_bad_keys_and_values() {
        let mut config = CliConfig::default();
        assert!(config.get("colour").is_err());
        assert!(config.set("colour", "red").is_err());
        assert!(config.set("default_format", "yaml").is_err());
        assert!(config.set("graph.id_strategy", "uuid").is_err());
        assert!(config.set("vertex.default_label", "").is_err());
        assert_eq!(config, CliConfig::default());
    }
}
