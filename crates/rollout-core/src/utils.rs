//! Path helpers shared by the pointer swap and the transfer code

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::{Error, Result};

/// Calculate a relative path from directory `from` to `to`
pub fn make_relative_path(from: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common_len = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = Utf8PathBuf::new();
    for _ in common_len..from_parts.len() {
        result.push("..");
    }
    for part in &to_parts[common_len..] {
        result.push(part.as_str());
    }

    result
}

/// Make `path` absolute against the working directory and resolve `.` and
/// `..` lexically, without touching the filesystem
pub fn normalize_path(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir()?;
        utf8_path(&cwd)?.join(path)
    };

    let mut result = Utf8PathBuf::new();
    for component in absolute.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_str()),
        }
    }
    Ok(result)
}

/// Symlink value that makes an entry in `link_dir` resolve to `to`.
///
/// Both paths must be normalized. The value is relative unless the two
/// share nothing below the filesystem root.
pub fn link_value(link_dir: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    let shared = link_dir
        .components()
        .zip(to.components())
        .take_while(|(a, b)| a == b)
        .filter(|(a, _)| matches!(a, Utf8Component::Normal(_)))
        .count();

    if shared == 0 {
        to.to_path_buf()
    } else {
        make_relative_path(link_dir, to)
    }
}

/// Convert a std path coming out of walkdir or read_dir into a UTF-8 path
pub fn utf8_path(path: &std::path::Path) -> Result<&Utf8Path> {
    Utf8Path::from_path(path).ok_or_else(|| {
        Error::transfer(
            format!("Path is not valid UTF-8: {:?}", path),
            "Ensure all file paths contain only valid UTF-8 characters",
        )
    })
}

/// Check whether anything (including a dangling symlink) exists at `path`
pub fn entry_exists(path: &Utf8Path) -> bool {
    path.symlink_metadata().is_ok()
}
