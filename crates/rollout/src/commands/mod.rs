//! Command implementations

pub mod deploy;
pub mod inspect;
pub mod prune;
pub mod release;

use camino::Utf8Path;
use miette::Result;
use rollout_core::config::{Config, TargetSettings};

/// Load the configuration and resolve one target from it
pub(crate) fn load_target(config_dir: &Utf8Path, name: &str) -> Result<TargetSettings> {
    let config = Config::load(config_dir)?;
    Ok(config.target(name, config_dir)?)
}
