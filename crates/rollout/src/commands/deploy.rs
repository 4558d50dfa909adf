//! Deploy command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::Result;
use rollout_core::deploy::{Deployer, LocalCopy, NoopController, ServiceController, ShellHook};
use rollout_core::ReleaseManager;

use super::load_target;
use super::release::release_id;

/// Arguments for the deploy command
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Directory holding the built files
    pub source: String,

    /// Release id (default: current UTC time as YYYYmmddHHMMSS)
    #[arg(long)]
    pub id: Option<String>,

    /// Skip the post_activate hook
    #[arg(long)]
    pub no_hooks: bool,

    /// Keep every old release
    #[arg(long)]
    pub no_prune: bool,

    /// Dry run - show what would be deployed
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the deploy command
pub fn run(config_dir: &Utf8Path, args: DeployArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let id = release_id(args.id.as_deref())?;
    let source = Utf8PathBuf::from(&args.source);

    let hook = settings
        .post_activate
        .as_ref()
        .filter(|_| !args.no_hooks)
        .map(ShellHook::new);

    if args.dry_run {
        println!("Would deploy {} to target '{}'", source, args.target);
        println!("Release: {}", settings.target.release_path(&id));
        println!("Pointer: {}", settings.target.current_link());
        println!("Excluded: {}", settings.exclude.join(", "));
        if let (Some(command), false) = (&settings.post_activate, args.no_hooks) {
            println!("Post-activate: {}", command);
        }
        if !args.no_prune {
            println!("Keep: {}", settings.keep);
        }
        return Ok(());
    }

    let manager = ReleaseManager::new();
    let copier = LocalCopy::new(settings.exclude.as_slice())?;
    let controller: &dyn ServiceController = match hook {
        Some(ref hook) => hook,
        None => &NoopController,
    };

    let mut deployer = Deployer::new(&manager, &copier, controller);
    if !args.no_prune {
        deployer = deployer.with_prune(settings.keep);
    }

    tracing::info!("Deploying {} to target '{}'", source, args.target);
    let outcome = deployer.deploy(&settings.target, &source, &id)?;

    println!(
        "{} is now live for '{}' ({} files, {} bytes, {} excluded)",
        outcome.release.id,
        args.target,
        outcome.stats.files,
        outcome.stats.bytes,
        outcome.stats.skipped
    );
    for release in &outcome.pruned {
        println!("Removed {}", release.id);
    }

    if let Some(e) = outcome.reload_error {
        return Err(miette::Report::new(e)
            .wrap_err("Release is live but the post_activate hook failed"));
    }

    Ok(())
}
