//! Deployment pipeline: create, transfer, cut over, reload, prune
//!
//! The two collaborators a deploy needs from outside the release manager are
//! traits:
//! - [`FileTransfer`]: populates the new release directory
//! - [`ServiceController`]: reloads the running service after cutover
//!
//! **Note**: cutover relies on unix symlinks; other platforms fall back to a
//! pointer file.

mod service;
mod transfer;

pub use service::{NoopController, ServiceController, ShellHook};
pub use transfer::{FileTransfer, LocalCopy, TransferStats};

use camino::Utf8Path;

use crate::manager::ReleaseManager;
use crate::release::{Release, ReleaseId};
use crate::target::DeploymentTarget;
use crate::{Error, Result};

/// Result of a completed deploy
#[derive(Debug)]
pub struct DeployOutcome {
    /// The release that is now live
    pub release: Release,
    pub stats: TransferStats,
    /// Releases removed by the post-deploy prune
    pub pruned: Vec<Release>,
    /// Service reload failure; the cutover stands regardless
    pub reload_error: Option<Error>,
}

/// Runs one deploy against a target
pub struct Deployer<'a> {
    manager: &'a ReleaseManager,
    transfer: &'a dyn FileTransfer,
    controller: &'a dyn ServiceController,
    keep: Option<usize>,
}

impl<'a> Deployer<'a> {
    pub fn new(
        manager: &'a ReleaseManager,
        transfer: &'a dyn FileTransfer,
        controller: &'a dyn ServiceController,
    ) -> Self {
        Self {
            manager,
            transfer,
            controller,
            keep: None,
        }
    }

    /// Prune down to `keep` releases after a successful cutover
    pub fn with_prune(mut self, keep: usize) -> Self {
        self.keep = Some(keep);
        self
    }

    /// Deploy the files under `source` as release `id`.
    ///
    /// A release whose transfer fails is removed again and never becomes
    /// live. Reload and prune problems after the cutover are logged and do
    /// not undo it.
    pub fn deploy(
        &self,
        target: &DeploymentTarget,
        source: &Utf8Path,
        id: &ReleaseId,
    ) -> Result<DeployOutcome> {
        let release = self.manager.create_release(target, id)?;

        let stats = match self.transfer.transfer(source, &release.path) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(release = %id, error = %e, "Transfer failed, discarding release");
                if let Err(cleanup) = self.manager.discard(target, id) {
                    tracing::warn!(release = %id, error = %cleanup, "Failed to discard release");
                }
                return Err(e);
            }
        };

        self.manager.activate(target, id)?;

        let reload_error = self.controller.reload(target, &release).err();
        if let Some(ref e) = reload_error {
            tracing::warn!(release = %id, error = %e, "Service reload failed; cutover kept");
        }

        let pruned = match self.keep {
            Some(keep) => self.manager.prune(target, keep).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Prune after deploy failed");
                Vec::new()
            }),
            None => Vec::new(),
        };

        tracing::info!(target_name = %target.name, release = %id, "Deployment complete");
        Ok(DeployOutcome {
            release,
            stats,
            pruned,
            reload_error,
        })
    }
}
