//! The live-release pointer
//!
//! On unix the pointer is a symlink. It is replaced by creating a new link
//! beside it and renaming that over the old one, so a reader resolving the
//! pointer sees either the old value or the new one and never a missing link.
//! Other platforms get a small pointer file replaced the same way.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;

use crate::utils::entry_exists;
use crate::Result;

/// Read the pointer's raw value, `None` if it has never been set
pub fn read(link: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
    match read_value(link) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Atomically replace the pointer with `value`.
///
/// On failure the previous pointer is left untouched and the temporary
/// entry is cleaned up.
pub fn swap(link: &Utf8Path, value: &Utf8Path) -> Result<()> {
    let tmp = temp_path(link);
    if entry_exists(&tmp) {
        tracing::debug!(path = %tmp, "Removing stale temporary pointer");
        std::fs::remove_file(&tmp)?;
    }

    write_value(&tmp, value)?;

    if let Err(e) = std::fs::rename(&tmp, link) {
        if let Err(cleanup) = std::fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp, error = %cleanup, "Failed to remove temporary pointer");
        }
        return Err(e.into());
    }

    sync_parent(link);
    Ok(())
}

fn temp_path(link: &Utf8Path) -> Utf8PathBuf {
    let name = link.file_name().unwrap_or("current");
    link.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}

#[cfg(unix)]
fn read_value(link: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
    let value = std::fs::read_link(link)?;
    Utf8PathBuf::try_from(value).map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
}

#[cfg(unix)]
fn write_value(tmp: &Utf8Path, value: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(value, tmp)
}

#[cfg(not(unix))]
fn read_value(link: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
    let content = std::fs::read_to_string(link)?;
    Ok(Utf8PathBuf::from(content.trim_end()))
}

#[cfg(not(unix))]
fn write_value(tmp: &Utf8Path, value: &Utf8Path) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(tmp)?;
    file.write_all(value.as_str().as_bytes())?;
    file.sync_all()
}

/// Flush the directory entry so the new pointer survives a crash
#[cfg(unix)]
fn sync_parent(link: &Utf8Path) {
    if let Some(parent) = link.parent() {
        let result = std::fs::File::open(parent).and_then(|dir| dir.sync_all());
        if let Err(e) = result {
            tracing::debug!(path = %parent, error = %e, "Failed to sync directory");
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_link: &Utf8Path) {}
