//! Read-only commands: list, current, history

use camino::Utf8Path;
use clap::Args;
use miette::Result;
use rollout_core::history::History;
use rollout_core::ReleaseManager;

use super::load_target;

/// Arguments naming a single target
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,
}

/// Arguments for the history command
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Show at most this many cutovers
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

/// List releases, marking the live one
pub fn list(config_dir: &Utf8Path, args: TargetArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let manager = ReleaseManager::new();

    let releases = manager.list_releases(&settings.target)?;
    if releases.is_empty() {
        println!("No releases for target '{}'", args.target);
        return Ok(());
    }

    let live = manager.current(&settings.target)?;
    for release in &releases {
        let marker = if live.as_ref() == Some(&release.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  {}",
            marker,
            release.id,
            release.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            release.path
        );
    }

    Ok(())
}

/// Print the live release id
pub fn current(config_dir: &Utf8Path, args: TargetArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;

    match ReleaseManager::new().current(&settings.target)? {
        Some(id) => println!("{}", id),
        None => {
            return Err(miette::miette!(
                help = "Deploy or activate a release first",
                "No release is live for target '{}'",
                args.target
            ));
        }
    }

    Ok(())
}

/// Print recent cutovers, newest first
pub fn history(config_dir: &Utf8Path, args: HistoryArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let history = History::load(&settings.target.history_path())?;

    if history.activations.is_empty() {
        println!("No activations recorded for target '{}'", args.target);
        return Ok(());
    }

    for activation in history.activations.iter().rev().take(args.limit) {
        let previous = activation
            .previous
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {} -> {}",
            activation.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            previous,
            activation.release
        );
    }

    Ok(())
}
