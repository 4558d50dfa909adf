//! Configuration file parsing and merging
//!
//! This module handles parsing of `rollout.toml` and `rollout.local.toml`
//! files. Tables are merged recursively; arrays and scalars from the local
//! file replace the base value.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::target::{DeploymentTarget, DEFAULT_CURRENT_LINK, DEFAULT_RELEASES_DIR};
use crate::{Error, Result};

/// Base configuration file name
pub const CONFIG_FILE: &str = "rollout.toml";

/// Machine-local override file name
pub const LOCAL_CONFIG_FILE: &str = "rollout.local.toml";

/// Main configuration structure for rollout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings applied to every target unless overridden
    pub defaults: Defaults,

    /// Deployment targets by name
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Default target settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Number of releases to retain when pruning (default: 5)
    pub keep: usize,

    /// Releases directory relative to the target root (default: "releases")
    pub releases_dir: Utf8PathBuf,

    /// Live pointer relative to the target root (default: "current")
    pub current_link: Utf8PathBuf,

    /// File name globs never copied into a release
    pub exclude: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            keep: 5,
            releases_dir: Utf8PathBuf::from(DEFAULT_RELEASES_DIR),
            current_link: Utf8PathBuf::from(DEFAULT_CURRENT_LINK),
            exclude: [".env", ".env.*", "*.pem", "*.key"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Per-target configuration; unset fields fall back to [`Defaults`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target root directory
    #[serde(default)]
    pub root: Utf8PathBuf,

    pub keep: Option<usize>,

    pub releases_dir: Option<Utf8PathBuf>,

    pub current_link: Option<Utf8PathBuf>,

    pub exclude: Option<Vec<String>>,

    /// Command run after a successful cutover.
    /// Supports `{target}`, `{release}` and `{path}` placeholders.
    pub post_activate: Option<String>,
}

/// Fully resolved settings for one target
#[derive(Debug, Clone)]
pub struct TargetSettings {
    pub target: DeploymentTarget,
    pub keep: usize,
    pub exclude: Vec<String>,
    pub post_activate: Option<String>,
}

impl Config {
    /// Load configuration from a directory.
    ///
    /// This loads `rollout.toml` and merges `rollout.local.toml` over it if it exists.
    pub fn load(config_dir: &Utf8Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        let local_config_path = config_dir.join(LOCAL_CONFIG_FILE);

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let local_config = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        } else {
            None
        };

        let merged = if let Some(local) = local_config {
            merge_toml_values(base_config, local)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;
        config.validate()?;

        tracing::debug!(
            dir = %config_dir,
            targets = config.targets.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, target) in &self.targets {
            if target.root.as_str().is_empty() {
                return Err(Error::config(
                    format!("Target '{}' has no root directory", name),
                    format!("Add `root = \"...\"` under [targets.{}]", name),
                ));
            }
        }
        Ok(())
    }

    /// Resolve a named target, with relative roots taken from `config_dir`
    pub fn target(&self, name: &str, config_dir: &Utf8Path) -> Result<TargetSettings> {
        let target = self.targets.get(name).ok_or_else(|| {
            let available = if self.targets.is_empty() {
                "(none configured)".to_string()
            } else {
                self.targets.keys().cloned().collect::<Vec<_>>().join(", ")
            };
            Error::config(
                format!("Deploy target '{}' not found in {}", name, CONFIG_FILE),
                format!("Available targets: {}", available),
            )
        })?;

        let root = if target.root.is_absolute() {
            target.root.clone()
        } else {
            config_dir.join(&target.root)
        };

        let releases_dir = target
            .releases_dir
            .as_ref()
            .unwrap_or(&self.defaults.releases_dir);
        let current_link = target
            .current_link
            .as_ref()
            .unwrap_or(&self.defaults.current_link);

        Ok(TargetSettings {
            target: DeploymentTarget::with_layout(name, root, releases_dir, current_link),
            keep: target.keep.unwrap_or(self.defaults.keep),
            exclude: target
                .exclude
                .clone()
                .unwrap_or_else(|| self.defaults.exclude.clone()),
            post_activate: target.post_activate.clone(),
        })
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}
