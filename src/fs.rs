//! File-system helpers for reading sources and publishing outputs.
use std::path::{Component, Path, PathBuf};

use crate::error::TransformError;

fn io_err(path: &Path, source: std::io::Error) -> TransformError {
    TransformError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component where there is one. The file system is not consulted.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), TransformError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    Ok(())
}

/// Read a source file as UTF-8.
///
/// # Errors
///
/// Returns [`TransformError::Io`] naming `path`.
pub fn read_source(path: &Path) -> Result<String, TransformError> {
    std::fs::read_to_string(path).map_err(|e| io_err(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".jsforge.tmp");
    PathBuf::from(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".jsforge.bak");
    PathBuf::from(name)
}

/// Write `contents` to `path` through a sibling temporary file and a rename.
///
/// Readers see either the old file or the complete new one. On any failure
/// the temporary file is removed and `path` is left as it was.
///
/// # Errors
///
/// Returns [`TransformError::Io`] if the parent directory cannot be created,
/// the temporary file cannot be written, or the rename fails.
pub fn atomic_write(path: &Path, contents: &str) -> Result<(), TransformError> {
    publish_all(&[(path, contents)])
}

/// Publish several files as one unit.
///
/// Every file is first written to its temporary sibling; only when all of
/// them are on disk are they renamed into place. If any step fails, the
/// temporary files are removed, files already renamed are taken back out,
/// and files they replaced are restored. Either every destination holds its
/// new contents or every destination is as it was.
///
/// # Errors
///
/// Returns the first [`TransformError::Io`] encountered.
pub fn publish_all<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<(), TransformError> {
    let mut staged: Vec<(&Path, PathBuf)> = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        let written = ensure_parent_dir(path)
            .and_then(|()| std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e)));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            discard(&staged);
            return Err(e);
        }
        staged.push((path, tmp));
    }

    let mut committed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    for (index, (path, tmp)) in staged.iter().enumerate() {
        match commit(path, tmp) {
            Ok(backup) => committed.push((*path, backup)),
            Err(e) => {
                discard(staged.get(index..).unwrap_or_default());
                roll_back(&committed);
                return Err(e);
            }
        }
    }

    for backup in committed.into_iter().filter_map(|(_, b)| b) {
        let _ = std::fs::remove_file(backup);
    }
    Ok(())
}

/// Rename `tmp` over `path`, keeping a copy of any file it replaces.
fn commit(path: &Path, tmp: &Path) -> Result<Option<PathBuf>, TransformError> {
    let backup = if path.is_file() {
        let backup = backup_path(path);
        std::fs::copy(path, &backup).map_err(|e| io_err(path, e))?;
        Some(backup)
    } else {
        None
    };
    if let Err(e) = std::fs::rename(tmp, path) {
        if let Some(backup) = &backup {
            let _ = std::fs::remove_file(backup);
        }
        return Err(io_err(path, e));
    }
    Ok(backup)
}

fn discard(staged: &[(&Path, PathBuf)]) {
    for (_, tmp) in staged {
        let _ = std::fs::remove_file(tmp);
    }
}

fn roll_back(committed: &[(&Path, Option<PathBuf>)]) {
    for (path, backup) in committed.iter().rev() {
        match backup {
            Some(backup) => {
                let _ = std::fs::rename(backup, path);
            }
            None => {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}
