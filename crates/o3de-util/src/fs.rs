//! Filesystem utilities for the O3DE tooling.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| io_err(path, source))
}

/// Copy `src` to `dest`, creating parent directories and replacing any existing file.
///
/// # Errors
/// Returns an error if the parent cannot be created or the copy fails.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    if dest.exists() {
        clear_readonly(dest)?;
    }
    std::fs::copy(src, dest).map_err(|source| io_err(dest, source))?;
    Ok(())
}

/// Recursively copy the contents of `src` into `dest`.
///
/// Entries whose file name matches any of `ignore` are skipped. Returns the
/// number of files copied.
///
/// # Errors
/// Returns an error if `src` cannot be read or any file cannot be copied.
pub fn copy_dir_filtered(
    src: &Path,
    dest: &Path,
    ignore: &[glob::Pattern],
) -> Result<usize, UtilError> {
    ensure_dir(dest)?;
    let mut copied = 0usize;
    let entries = std::fs::read_dir(src).map_err(|source| io_err(src, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| io_err(src, source))?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if ignore.iter().any(|p| p.matches(&name_str)) {
            continue;
        }
        let from = entry.path();
        let to = dest.join(&name);
        if from.is_dir() {
            copied = copied.saturating_add(copy_dir_filtered(&from, &to, ignore)?);
        } else {
            copy_file(&from, &to)?;
            copied = copied.saturating_add(1);
        }
    }
    Ok(copied)
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_err(path, source)),
    }
}

/// Delete everything inside `path`, leaving the directory itself in place.
///
/// Files checked out read-only by a VCS make the first attempt fail; in that case
/// write permission is restored on the whole tree and the removal is retried once.
///
/// # Errors
/// Returns an error if the contents cannot be removed even after the retry.
pub fn clean_dir(path: &Path) -> Result<(), UtilError> {
    if !path.exists() {
        return ensure_dir(path);
    }
    if remove_children(path).is_err() {
        tracing::debug!(path = %path.display(), "retrying clean after clearing read-only bits");
        make_tree_writable(path)?;
        remove_children(path).map_err(|source| io_err(path, source))?;
    }
    Ok(())
}

fn remove_children(path: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(path)? {
        let child = entry?.path();
        if child.is_dir() && !child.is_symlink() {
            std::fs::remove_dir_all(&child)?;
        } else {
            std::fs::remove_file(&child)?;
        }
    }
    Ok(())
}

fn make_tree_writable(path: &Path) -> Result<(), UtilError> {
    clear_readonly(path)?;
    if path.is_dir() && !path.is_symlink() {
        let entries = std::fs::read_dir(path).map_err(|source| io_err(path, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_err(path, source))?;
            make_tree_writable(&entry.path())?;
        }
    }
    Ok(())
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) -> Result<(), UtilError> {
    let metadata = std::fs::symlink_metadata(path).map_err(|source| io_err(path, source))?;
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        std::fs::set_permissions(path, permissions).map_err(|source| io_err(path, source))?;
    }
    Ok(())
}

/// Write `contents` to `path` atomically.
///
/// Data goes to a sibling `<name>.tmp` file first and is then renamed over the
/// destination, so readers never observe a partially written file.
///
/// # Errors
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), UtilError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents).map_err(|source| io_err(&tmp_path, source))?;
    if let Err(source) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, source));
    }
    Ok(())
}

/// Return the user's home directory.
///
/// Resolves via `HOME` (Unix) or `USERPROFILE` (Windows).
///
/// # Errors
/// Returns an error if neither environment variable is set.
pub fn home_dir() -> Result<PathBuf, UtilError> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .map_err(|_| UtilError::NoHomeDir)
}

/// Return the O3DE home directory.
///
/// `O3DE_HOME` wins when set; otherwise this is `~/.o3de`.
///
/// # Errors
/// Returns an error if no home directory can be determined.
pub fn o3de_home() -> Result<PathBuf, UtilError> {
    if let Ok(custom) = std::env::var("O3DE_HOME") {
        if !custom.is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    Ok(home_dir()?.join(".o3de"))
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Canonicalize a path, falling back to the input if it does not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Return `true` if `dir` is missing or contains no entries.
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).map_or(true, |mut entries| entries.next().is_none())
}
