//! Populating release directories

use camino::Utf8Path;
use walkdir::WalkDir;

use crate::utils::utf8_path;
use crate::{Error, Result};

/// Copies a build's files into a freshly created release directory
pub trait FileTransfer {
    /// Copy everything under `source` into `release_dir`.
    ///
    /// Must report failure before the release is activated.
    fn transfer(&self, source: &Utf8Path, release_dir: &Utf8Path) -> Result<TransferStats>;
}

/// What a transfer moved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files: usize,
    pub bytes: u64,
    pub skipped: usize,
}

/// Local recursive copy that skips secret files.
///
/// Exclusion patterns are globs matched against each entry's file name; a
/// matching directory is skipped with everything below it. Symlinks are
/// copied as symlinks.
#[derive(Debug, Clone)]
pub struct LocalCopy {
    exclude: Vec<glob::Pattern>,
}

impl LocalCopy {
    /// Build a copier from exclusion globs such as `.env` or `*.pem`
    pub fn new<S: AsRef<str>>(exclude: &[S]) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p.as_ref()).map_err(|e| {
                    Error::config(
                        format!("Invalid exclude pattern '{}': {}", p.as_ref(), e),
                        "Exclude patterns use glob syntax, e.g. \".env.*\"",
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { exclude })
    }

    fn is_excluded(&self, file_name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(file_name))
    }
}

impl FileTransfer for LocalCopy {
    fn transfer(&self, source: &Utf8Path, release_dir: &Utf8Path) -> Result<TransferStats> {
        if !source.is_dir() {
            return Err(Error::transfer(
                format!("Source directory does not exist: {}", source),
                "Point the deploy at the directory holding the built files",
            ));
        }

        std::fs::create_dir_all(release_dir)?;
        let mut stats = TransferStats::default();

        let walker = WalkDir::new(source)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                let excluded = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.is_excluded(name));
                if excluded {
                    tracing::debug!(path = ?entry.path(), "Excluded from release");
                    stats.skipped += 1;
                }
                !excluded
            });

        // filter_entry borrows stats mutably, so count copied entries separately
        let mut files = 0;
        let mut bytes = 0;

        for entry in walker {
            let entry = entry.map_err(|e| {
                Error::transfer(
                    format!("Failed to read directory entry: {}", e),
                    "Check directory permissions",
                )
            })?;

            let src_path = utf8_path(entry.path())?;
            let rel_path = src_path.strip_prefix(source).map_err(|_| {
                Error::transfer(
                    format!("Failed to strip source prefix from {}", src_path),
                    "This is an unexpected internal error",
                )
            })?;
            let dst_path = release_dir.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dst_path)?;
            } else if entry.file_type().is_symlink() {
                copy_symlink(src_path, &dst_path)?;
                files += 1;
            } else {
                if let Some(parent) = dst_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                bytes += std::fs::copy(src_path, &dst_path)?;
                files += 1;
            }
        }

        stats.files = files;
        stats.bytes = bytes;

        tracing::info!(
            source = %source,
            release = %release_dir,
            files = stats.files,
            bytes = stats.bytes,
            skipped = stats.skipped,
            "Transferred files"
        );
        Ok(stats)
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    let target = std::fs::read_link(src)?;
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(target, dst)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    // Without unix symlinks, copy what the link points at
    std::fs::copy(src, dst)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> (TempDir, camino::Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let src = Utf8Path::from_path(temp_dir.path()).unwrap().join("build");

        fs::create_dir_all(src.join("static/css")).unwrap();
        fs::create_dir_all(src.join("certs")).unwrap();
        fs::write(src.join("server.js"), "console.log(1)").unwrap();
        fs::write(src.join("static/css/style.css"), "body {}").unwrap();
        fs::write(src.join(".env"), "SECRET=1").unwrap();
        fs::write(src.join(".env.production"), "SECRET=2").unwrap();
        fs::write(src.join("certs/site.pem"), "---").unwrap();

        (temp_dir, src)
    }

    #[test]
    fn test_copy_excludes_secrets() {
        let (temp_dir, src) = tree();
        let dst = Utf8Path::from_path(temp_dir.path()).unwrap().join("release");

        let copier = LocalCopy::new(&[".env", ".env.*", "*.pem"]).unwrap();
        let stats = copier.transfer(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("server.js")).unwrap(), "console.log(1)");
        assert!(dst.join("static/css/style.css").exists());
        assert!(dst.join("certs").is_dir());
        assert!(!dst.join(".env").exists());
        assert!(!dst.join(".env.production").exists());
        assert!(!dst.join("certs/site.pem").exists());

        assert_eq!(stats.files, 2);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.bytes, ("console.log(1)".len() + "body {}".len()) as u64);
    }

    #[test]
    fn test_excluded_directory_is_skipped_whole() {
        let (temp_dir, src) = tree();
        let dst = Utf8Path::from_path(temp_dir.path()).unwrap().join("release");

        LocalCopy::new(&["certs"]).unwrap().transfer(&src, &dst).unwrap();

        assert!(!dst.join("certs").exists());
        assert!(dst.join(".env").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_preserved() {
        let (temp_dir, src) = tree();
        std::os::unix::fs::symlink("server.js", src.join("index.js")).unwrap();
        let dst = Utf8Path::from_path(temp_dir.path()).unwrap().join("release");

        LocalCopy::new::<&str>(&[]).unwrap().transfer(&src, &dst).unwrap();

        assert_eq!(
            fs::read_link(dst.join("index.js")).unwrap(),
            std::path::PathBuf::from("server.js")
        );
    }

    #[test]
    fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        let err = LocalCopy::new(&[".env"])
            .unwrap()
            .transfer(&root.join("missing"), &root.join("release"))
            .unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(matches!(
            LocalCopy::new(&["[unclosed"]),
            Err(Error::Config { .. })
        ));
    }
}
