//! Activation history
//!
//! Every successful cutover appends a record to `.rollout/history.json`
//! under the target root, so operators can see what was live and when.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::release::ReleaseId;
use crate::{Error, Result};

/// Number of records kept in the history file
pub const MAX_HISTORY: usize = 100;

/// One cutover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    /// When the pointer was swapped
    pub timestamp: DateTime<Utc>,
    /// Release made live
    pub release: ReleaseId,
    /// Release that was live before, if any
    pub previous: Option<ReleaseId>,
}

impl Activation {
    /// Record a cutover happening now
    pub fn new(release: ReleaseId, previous: Option<ReleaseId>) -> Self {
        Self {
            timestamp: Utc::now(),
            release,
            previous,
        }
    }
}

/// Ordered list of cutovers, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    pub activations: Vec<Activation>,
}

impl History {
    /// Load the history from a file, empty if the file does not exist
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::state(
                format!("Failed to parse activation history {}: {}", path, e),
                "The history file may be corrupted. Try deleting it.",
            )
        })
    }

    /// Save the history, replacing the file atomically
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::state(
                format!("Failed to serialize activation history: {}", e),
                "This is likely a bug in rollout",
            )
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Append a record, dropping the oldest ones beyond [`MAX_HISTORY`]
    pub fn push(&mut self, activation: Activation) {
        self.activations.push(activation);
        if self.activations.len() > MAX_HISTORY {
            let excess = self.activations.len() - MAX_HISTORY;
            self.activations.drain(..excess);
        }
    }

    /// Most recent cutover
    pub fn last(&self) -> Option<&Activation> {
        self.activations.last()
    }

    /// Load, append and save in one step
    pub fn record(path: &Utf8Path, activation: Activation) -> Result<()> {
        let mut history = Self::load(path)?;
        history.push(activation);
        history.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ReleaseId {
        ReleaseId::new(s).unwrap()
    }

    #[test]
    fn test_history_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(temp_dir.path())
            .unwrap()
            .join(".rollout/history.json");

        let mut history = History::default();
        history.push(Activation::new(id("1"), None));
        history.push(Activation::new(id("2"), Some(id("1"))));
        history.save(&path).unwrap();

        let loaded = History::load(&path).unwrap();
        assert_eq!(loaded, history);
        assert_eq!(loaded.last().unwrap().previous, Some(id("1")));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_history_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(temp_dir.path())
            .unwrap()
            .join("nonexistent.json");

        assert!(History::load(&path).unwrap().activations.is_empty());
    }

    #[test]
    fn test_history_corrupted_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(temp_dir.path()).unwrap().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(History::load(&path), Err(Error::State { .. })));
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = History::default();
        for n in 0..MAX_HISTORY + 5 {
            history.push(Activation::new(id(&n.to_string()), None));
        }

        assert_eq!(history.activations.len(), MAX_HISTORY);
        assert_eq!(history.activations[0].release, id("5"));
    }
}
