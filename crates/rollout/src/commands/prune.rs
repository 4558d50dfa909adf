//! Prune command implementation

use camino::Utf8Path;
use clap::Args;
use miette::Result;
use rollout_core::ReleaseManager;

use super::load_target;

/// Arguments for the prune command
#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Number of releases to keep, including the live one (default: from rollout.toml)
    #[arg(short, long)]
    pub keep: Option<usize>,
}

/// Run the prune command
pub fn run(config_dir: &Utf8Path, args: PruneArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let keep = args.keep.unwrap_or(settings.keep);

    let pruned = ReleaseManager::new().prune(&settings.target, keep)?;

    if pruned.is_empty() {
        println!("Nothing to prune (keeping {})", keep);
    } else {
        for release in &pruned {
            println!("Removed {}", release.id);
        }
    }

    Ok(())
}
