//! Deployment target layout

use camino::{Utf8Path, Utf8PathBuf};

use crate::release::ReleaseId;

/// Default name of the releases directory under a target root
pub const DEFAULT_RELEASES_DIR: &str = "releases";

/// Default name of the live-release pointer under a target root
pub const DEFAULT_CURRENT_LINK: &str = "current";

/// Directory holding rollout's own bookkeeping under a target root
pub const STATE_DIR: &str = ".rollout";

/// One deployable unit on the host (e.g. "backend").
///
/// Every [`ReleaseManager`](crate::ReleaseManager) operation takes the target
/// explicitly; nothing about it is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Target name
    pub name: String,
    /// Target root directory
    pub root: Utf8PathBuf,
    releases_dir: Utf8PathBuf,
    current_link: Utf8PathBuf,
}

impl DeploymentTarget {
    /// Target using the default `releases/` and `current` names
    pub fn new(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self::with_layout(name, root, DEFAULT_RELEASES_DIR, DEFAULT_CURRENT_LINK)
    }

    /// Target with custom releases directory and pointer names, relative to root
    pub fn with_layout(
        name: impl Into<String>,
        root: impl Into<Utf8PathBuf>,
        releases_dir: impl AsRef<Utf8Path>,
        current_link: impl AsRef<Utf8Path>,
    ) -> Self {
        let root = root.into();
        Self {
            name: name.into(),
            releases_dir: root.join(releases_dir),
            current_link: root.join(current_link),
            root,
        }
    }

    /// Container of all release directories
    pub fn releases_dir(&self) -> &Utf8Path {
        &self.releases_dir
    }

    /// Path of the live-release pointer
    pub fn current_link(&self) -> &Utf8Path {
        &self.current_link
    }

    /// Directory of a given release
    pub fn release_path(&self, id: &ReleaseId) -> Utf8PathBuf {
        self.releases_dir.join(id.as_str())
    }

    /// Bookkeeping directory for this target
    pub fn state_dir(&self) -> Utf8PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Activation history file
    pub fn history_path(&self) -> Utf8PathBuf {
        self.state_dir().join("history.json")
    }
}
