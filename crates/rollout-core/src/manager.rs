//! Release manager
//!
//! Creates release directories, performs the atomic cutover of the
//! `current` pointer, rolls back and prunes. Writers for one target must be
//! serialized by the caller; the cutover guarantee is about readers.

use std::io::ErrorKind;

use camino::Utf8Path;

use crate::history::{Activation, History};
use crate::pointer;
use crate::release::{Release, ReleaseId};
use crate::target::DeploymentTarget;
use crate::utils::{link_value, normalize_path};
use crate::{Error, Result};

/// Manager for release operations on deployment targets
#[derive(Debug, Clone)]
pub struct ReleaseManager {
    record_history: bool,
}

impl Default for ReleaseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseManager {
    /// Create a manager that records every cutover in the target's history
    pub fn new() -> Self {
        Self {
            record_history: true,
        }
    }

    /// Skip writing `.rollout/history.json` on activation
    pub fn without_history(mut self) -> Self {
        self.record_history = false;
        self
    }

    /// Create an empty directory for a new release.
    ///
    /// Fails with [`Error::DuplicateRelease`] if the id is taken, leaving the
    /// releases directory as it was.
    pub fn create_release(&self, target: &DeploymentTarget, id: &ReleaseId) -> Result<Release> {
        std::fs::create_dir_all(target.releases_dir())?;

        let path = target.release_path(id);
        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::duplicate_release(id.as_str()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(target_name = %target.name, release = %id, path = %path, "Created release");
        Release::from_dir(id.clone(), &path)
    }

    /// Look up a single release
    pub fn release(&self, target: &DeploymentTarget, id: &ReleaseId) -> Result<Release> {
        let path = target.release_path(id);
        if !path.is_dir() {
            return Err(Error::release_not_found(id.as_str()));
        }
        Release::from_dir(id.clone(), &path)
    }

    /// Atomically make `id` the live release.
    ///
    /// Concurrent readers of the pointer see either the old release or the
    /// new one. On failure the old pointer stays in place. The release's
    /// contents are not inspected.
    pub fn activate(&self, target: &DeploymentTarget, id: &ReleaseId) -> Result<()> {
        let release = self.release(target, id)?;
        // An unreadable pointer must not block repairing it
        let previous = self.current(target).unwrap_or_else(|e| {
            tracing::warn!(target_name = %target.name, error = %e, "Ignoring unreadable pointer");
            None
        });

        let link = target.current_link();
        let dir = link_dir(target);
        std::fs::create_dir_all(dir)?;
        let value = link_value(&normalize_path(dir)?, &normalize_path(&release.path)?);

        pointer::swap(link, &value)?;

        match &previous {
            Some(prev) => tracing::info!(
                target_name = %target.name,
                release = %id,
                previous = %prev,
                "Activated release"
            ),
            None => tracing::info!(target_name = %target.name, release = %id, "Activated release"),
        }

        if self.record_history {
            let activation = Activation::new(id.clone(), previous);
            if let Err(e) = History::record(&target.history_path(), activation) {
                tracing::warn!(target_name = %target.name, error = %e, "Failed to record activation");
            }
        }

        Ok(())
    }

    /// Cut over to an existing release other than the live one
    pub fn rollback(&self, target: &DeploymentTarget, to: &ReleaseId) -> Result<()> {
        // Existence is checked first so a pruned id reports as not found
        self.release(target, to)?;

        let live = match self.current(target) {
            Ok(live) => live,
            // A stale pointer is exactly what a rollback repairs
            Err(e @ Error::State { .. }) => {
                tracing::warn!(target_name = %target.name, error = %e, "Replacing stale pointer");
                None
            }
            Err(e) => return Err(e),
        };
        if live.as_ref() == Some(to) {
            return Err(Error::AlreadyActive {
                id: to.to_string(),
            });
        }

        tracing::info!(target_name = %target.name, release = %to, "Rolling back");
        self.activate(target, to)
    }

    /// Roll back to the newest release older than the live one
    pub fn rollback_previous(&self, target: &DeploymentTarget) -> Result<Release> {
        let no_previous = || Error::NoPreviousRelease {
            target: target.name.clone(),
        };

        let current = self.current(target)?.ok_or_else(no_previous)?;
        let previous = self
            .list_releases(target)?
            .into_iter()
            .find(|r| r.id < current)
            .ok_or_else(no_previous)?;

        self.rollback(target, &previous.id)?;
        Ok(previous)
    }

    /// Id of the live release, `None` if nothing has been activated.
    ///
    /// Fails with [`Error::State`] when the pointer does not resolve to an
    /// existing release directory of this target.
    pub fn current(&self, target: &DeploymentTarget) -> Result<Option<ReleaseId>> {
        let link = target.current_link();
        let Some(value) = pointer::read(link)? else {
            return Ok(None);
        };

        let stale = |problem: String| {
            Error::state(
                format!("Pointer {} -> {} {}", link, value, problem),
                "Re-activate a release with `rollout activate`",
            )
        };

        // An absolute value replaces the base in join
        let resolved = normalize_path(&link_dir(target).join(&value))?;
        let releases_dir = normalize_path(target.releases_dir())?;
        if resolved.parent() != Some(releases_dir.as_path()) {
            return Err(stale(format!("is outside {}", target.releases_dir())));
        }

        let name = resolved
            .file_name()
            .ok_or_else(|| stale("has no release name".to_string()))?;
        let id = ReleaseId::new(name)?;

        if !resolved.is_dir() {
            return Err(stale(format!("dangles, release {} is gone", id)));
        }

        Ok(Some(id))
    }

    /// All releases of a target, newest first
    pub fn list_releases(&self, target: &DeploymentTarget) -> Result<Vec<Release>> {
        let entries = match std::fs::read_dir(target.releases_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::debug!(entry = ?entry.path(), "Skipping non UTF-8 entry");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            match ReleaseId::new(name) {
                Ok(id) => releases.push(self.release(target, &id)?),
                Err(e) => tracing::debug!(error = %e, "Skipping foreign directory"),
            }
        }

        releases.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(releases)
    }

    /// Delete the oldest releases beyond `keep`.
    ///
    /// The live release is never deleted and counts toward `keep`; the rest
    /// of the slots go to the newest other releases. Returns what was deleted.
    pub fn prune(&self, target: &DeploymentTarget, keep: usize) -> Result<Vec<Release>> {
        let releases = self.list_releases(target)?;
        if releases.len() <= keep {
            tracing::debug!(
                target_name = %target.name,
                count = releases.len(),
                keep,
                "Nothing to prune"
            );
            return Ok(Vec::new());
        }

        let live = self.current(target)?;
        let live_present = live
            .as_ref()
            .is_some_and(|id| releases.iter().any(|r| &r.id == id));
        let mut slots = if live_present {
            keep.saturating_sub(1)
        } else {
            keep
        };

        let mut doomed = Vec::new();
        for release in releases {
            if live.as_ref() == Some(&release.id) {
                continue;
            }
            if slots > 0 {
                slots -= 1;
                continue;
            }
            doomed.push(release);
        }

        for release in &doomed {
            std::fs::remove_dir_all(&release.path)?;
            tracing::info!(target_name = %target.name, release = %release.id, "Pruned release");
        }

        Ok(doomed)
    }

    /// Remove a release that never went live, e.g. after a failed transfer
    pub fn discard(&self, target: &DeploymentTarget, id: &ReleaseId) -> Result<()> {
        if self.current(target)?.as_ref() == Some(id) {
            return Err(Error::AlreadyActive { id: id.to_string() });
        }

        let path = target.release_path(id);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::info!(target_name = %target.name, release = %id, "Discarded release");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Directory the pointer lives in
fn link_dir(target: &DeploymentTarget) -> &Utf8Path {
    target
        .current_link()
        .parent()
        .unwrap_or(target.root.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DeploymentTarget) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap().join("backend");
        (temp_dir, DeploymentTarget::new("backend", root))
    }

    fn id(s: &str) -> ReleaseId {
        ReleaseId::new(s).unwrap()
    }

    #[test]
    fn test_create_release_makes_empty_dir() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();

        let release = manager.create_release(&target, &id("20240101000000")).unwrap();

        assert!(release.path.is_dir());
        assert_eq!(std::fs::read_dir(&release.path).unwrap().count(), 0);
        assert_eq!(release.created_at, release.id.timestamp().unwrap());
    }

    #[test]
    fn test_current_unset_on_fresh_target() {
        let (_tmp, target) = setup();
        assert!(ReleaseManager::new().current(&target).unwrap().is_none());
        assert!(ReleaseManager::new().list_releases(&target).unwrap().is_empty());
    }

    #[test]
    fn test_pointer_is_relative() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();
        manager.activate(&target, &id("a")).unwrap();

        let value = pointer::read(target.current_link()).unwrap().unwrap();
        assert_eq!(value, Utf8Path::new("releases/a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_current_rejects_pointer_that_does_not_resolve() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();
        std::fs::create_dir_all(target.root.join("elsewhere/a")).unwrap();

        // Release name is right but the directory is gone
        std::os::unix::fs::symlink("releases/b", target.current_link()).unwrap();
        let err = manager.current(&target).unwrap_err();
        assert!(matches!(err, Error::State { .. }), "got {:?}", err);

        // Existing directory outside the releases dir
        std::fs::remove_file(target.current_link()).unwrap();
        std::os::unix::fs::symlink("elsewhere/a", target.current_link()).unwrap();
        let err = manager.current(&target).unwrap_err();
        assert!(matches!(err, Error::State { .. }), "got {:?}", err);

        // Both activate and rollback repair the pointer
        manager.rollback(&target, &id("a")).unwrap();
        assert_eq!(manager.current(&target).unwrap(), Some(id("a")));
    }

    #[test]
    fn test_activate_creates_pointer_parent() {
        let (_tmp, target) = setup();
        let target = DeploymentTarget::with_layout("backend", target.root, "releases", "links/live");
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();

        manager.activate(&target, &id("a")).unwrap();

        let value = pointer::read(target.current_link()).unwrap().unwrap();
        assert_eq!(value, Utf8Path::new("../releases/a"));
        assert_eq!(manager.current(&target).unwrap(), Some(id("a")));
    }

    #[test]
    fn test_activate_records_history() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();
        manager.create_release(&target, &id("b")).unwrap();

        manager.activate(&target, &id("a")).unwrap();
        manager.activate(&target, &id("b")).unwrap();

        let history = History::load(&target.history_path()).unwrap();
        assert_eq!(history.activations.len(), 2);
        assert_eq!(history.activations[0].previous, None);
        assert_eq!(history.last().unwrap().release, id("b"));
        assert_eq!(history.last().unwrap().previous, Some(id("a")));
    }

    #[test]
    fn test_without_history_writes_nothing() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new().without_history();
        manager.create_release(&target, &id("a")).unwrap();
        manager.activate(&target, &id("a")).unwrap();

        assert!(!target.history_path().exists());
    }

    #[test]
    fn test_list_skips_hidden_and_files() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("1")).unwrap();
        std::fs::create_dir_all(target.releases_dir().join(".partial")).unwrap();
        std::fs::write(target.releases_dir().join("notes.txt"), "x").unwrap();

        let ids: Vec<_> = manager
            .list_releases(&target)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![id("1")]);
    }

    #[test]
    fn test_rollback_to_live_release_is_rejected() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();
        manager.activate(&target, &id("a")).unwrap();

        let err = manager.rollback(&target, &id("a")).unwrap_err();
        assert!(matches!(err, Error::AlreadyActive { .. }));
    }

    #[test]
    fn test_rollback_previous() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        for n in ["1", "2", "3"] {
            manager.create_release(&target, &id(n)).unwrap();
        }
        manager.activate(&target, &id("3")).unwrap();

        let previous = manager.rollback_previous(&target).unwrap();
        assert_eq!(previous.id, id("2"));
        assert_eq!(manager.current(&target).unwrap(), Some(id("2")));

        manager.rollback_previous(&target).unwrap();
        assert_eq!(manager.current(&target).unwrap(), Some(id("1")));

        let err = manager.rollback_previous(&target).unwrap_err();
        assert!(matches!(err, Error::NoPreviousRelease { .. }));
    }

    #[test]
    fn test_rollback_previous_without_live_release() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("1")).unwrap();

        let err = manager.rollback_previous(&target).unwrap_err();
        assert!(matches!(err, Error::NoPreviousRelease { .. }));
    }

    #[test]
    fn test_prune_without_live_release_keeps_newest() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        for n in ["1", "2", "3", "4"] {
            manager.create_release(&target, &id(n)).unwrap();
        }

        let deleted = manager.prune(&target, 2).unwrap();

        let deleted: Vec<_> = deleted.into_iter().map(|r| r.id).collect();
        assert_eq!(deleted, vec![id("2"), id("1")]);
    }

    #[test]
    fn test_prune_keep_zero_leaves_only_live() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        for n in ["1", "2", "3"] {
            manager.create_release(&target, &id(n)).unwrap();
        }
        manager.activate(&target, &id("2")).unwrap();

        manager.prune(&target, 0).unwrap();

        let remaining: Vec<_> = manager
            .list_releases(&target)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(remaining, vec![id("2")]);
    }

    #[test]
    fn test_discard_refuses_live_release() {
        let (_tmp, target) = setup();
        let manager = ReleaseManager::new();
        manager.create_release(&target, &id("a")).unwrap();
        manager.create_release(&target, &id("b")).unwrap();
        manager.activate(&target, &id("a")).unwrap();

        assert!(manager.discard(&target, &id("a")).is_err());
        manager.discard(&target, &id("b")).unwrap();
        assert!(!target.release_path(&id("b")).exists());
        // Discarding twice is harmless
        manager.discard(&target, &id("b")).unwrap();
    }
}
