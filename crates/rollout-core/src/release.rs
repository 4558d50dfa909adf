//! Release identifiers and descriptors

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Timestamp format used for generated release ids
pub const RELEASE_ID_FORMAT: &str = "%Y%m%d%H%M%S";

const MAX_ID_LEN: usize = 128;

/// Identifier of a release, unique per deployment target.
///
/// Ids order by plain string comparison, so generated timestamp ids sort
/// chronologically. Every id is also a valid single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Parse and validate a caller-supplied id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::invalid_release_id(id, "id is empty"));
        }
        if id.len() > MAX_ID_LEN {
            return Err(Error::invalid_release_id(
                id,
                format!("id is longer than {} bytes", MAX_ID_LEN),
            ));
        }
        if id.starts_with('.') {
            return Err(Error::invalid_release_id(id, "id starts with '.'"));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(Error::invalid_release_id(
                id.clone(),
                format!("character {:?} is not allowed", c),
            ));
        }

        Ok(Self(id))
    }

    /// Generate an id from the given time with second granularity
    pub fn from_time(time: DateTime<Utc>) -> Self {
        Self(time.format(RELEASE_ID_FORMAT).to_string())
    }

    /// Generate an id from the current time
    pub fn generate() -> Self {
        Self::from_time(Utc::now())
    }

    /// Creation time encoded in a generated id, if this is one
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, RELEASE_ID_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReleaseId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReleaseId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ReleaseId> for String {
    fn from(id: ReleaseId) -> Self {
        id.0
    }
}

impl AsRef<str> for ReleaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A materialized release directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release identifier (also the directory name)
    pub id: ReleaseId,
    /// Location of the release's files
    pub path: Utf8PathBuf,
    /// When the release was created
    pub created_at: DateTime<Utc>,
}

impl Release {
    /// Describe an existing release directory.
    ///
    /// The creation time comes from the id when it is a generated timestamp,
    /// otherwise from the directory's modification time.
    pub fn from_dir(id: ReleaseId, path: &Utf8Path) -> Result<Self> {
        let created_at = match id.timestamp() {
            Some(ts) => ts,
            None => DateTime::<Utc>::from(std::fs::metadata(path)?.modified()?),
        };

        Ok(Self {
            id,
            path: path.to_path_buf(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_valid_ids() {
        for id in ["20240101120000", "v1.2.3", "build_42-rc1"] {
            assert_eq!(ReleaseId::new(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn test_invalid_ids() {
        for id in ["", ".", "..", ".hidden", "a/b", "a b", "../etc", "rel\\1"] {
            let err = ReleaseId::new(id).unwrap_err();
            assert!(
                matches!(err, Error::InvalidReleaseId { .. }),
                "expected {:?} to be rejected",
                id
            );
        }

        let too_long = "a".repeat(MAX_ID_LEN + 1);
        assert!(ReleaseId::new(too_long).is_err());
    }

    #[test]
    fn test_generated_id_roundtrips_timestamp() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let id = ReleaseId::from_time(time);

        assert_eq!(id.as_str(), "20240309070501");
        assert_eq!(id.timestamp(), Some(time));
    }

    #[test]
    fn test_non_timestamp_id_has_no_timestamp() {
        assert!(ReleaseId::new("v1.0.0").unwrap().timestamp().is_none());
    }

    #[test]
    fn test_generated_ids_sort_chronologically() {
        let earlier = ReleaseId::from_time(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
        let later = ReleaseId::from_time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        assert!(earlier < later);
    }

    #[test]
    fn test_serde_rejects_invalid_id() {
        let ok: ReleaseId = serde_json::from_str("\"20240101000000\"").unwrap();
        assert_eq!(ok.as_str(), "20240101000000");
        assert!(serde_json::from_str::<ReleaseId>("\"../x\"").is_err());
    }
}
