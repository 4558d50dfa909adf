//! Commands that create releases or move the live pointer

use camino::Utf8Path;
use clap::Args;
use miette::Result;
use rollout_core::{ReleaseId, ReleaseManager};

use super::load_target;

/// Arguments for the create command
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Release id (default: current UTC time as YYYYmmddHHMMSS)
    #[arg(long)]
    pub id: Option<String>,
}

/// Arguments for the activate command
#[derive(Debug, Args)]
pub struct ActivateArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Release to make live
    pub release: String,
}

/// Arguments for the rollback command
#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Deploy target name (as defined in rollout.toml)
    pub target: String,

    /// Release to roll back to (default: the one before the live release)
    pub release: Option<String>,
}

/// Parse an optional id from the command line, generating one if absent
pub(crate) fn release_id(id: Option<&str>) -> Result<ReleaseId> {
    match id {
        Some(id) => Ok(ReleaseId::new(id)?),
        None => Ok(ReleaseId::generate()),
    }
}

/// Create an empty release and print its path for the transfer step
pub fn create(config_dir: &Utf8Path, args: CreateArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let id = release_id(args.id.as_deref())?;

    let release = ReleaseManager::new().create_release(&settings.target, &id)?;
    println!("{}", release.path);

    Ok(())
}

/// Make a release live
pub fn activate(config_dir: &Utf8Path, args: ActivateArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let id = ReleaseId::new(args.release)?;

    ReleaseManager::new().activate(&settings.target, &id)?;
    println!("{} is now live for '{}'", id, args.target);

    Ok(())
}

/// Roll back to an explicit release or the previous one
pub fn rollback(config_dir: &Utf8Path, args: RollbackArgs) -> Result<()> {
    let settings = load_target(config_dir, &args.target)?;
    let manager = ReleaseManager::new();

    let id = match args.release {
        Some(release) => {
            let id = ReleaseId::new(release)?;
            manager.rollback(&settings.target, &id)?;
            id
        }
        None => manager.rollback_previous(&settings.target)?.id,
    };

    println!("Rolled back '{}' to {}", args.target, id);
    Ok(())
}
