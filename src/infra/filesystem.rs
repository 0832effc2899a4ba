//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a file, symlink or directory tree; missing paths are fine
pub fn remove_all(path: &Path) -> Result<(), FilesystemError> {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FilesystemError::Remove {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory if present and create it empty
pub fn reset_dir(path: &Path) -> Result<(), FilesystemError> {
    remove_all(path)?;
    create_dir_all(path)
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a single file, creating the destination's parent directory
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| copy_error(from, to, &e))
}

/// Copy a file into a directory, keeping its name
pub fn copy_into(file: &Path, dir: &Path) -> Result<PathBuf, FilesystemError> {
    let name = file.file_name().ok_or_else(|| FilesystemError::Copy {
        from: file.to_path_buf(),
        to: dir.to_path_buf(),
        error: "source has no file name".to_string(),
    })?;
    let dest = dir.join(name);
    copy_file(file, &dest)?;
    Ok(dest)
}

/// Recursively copy the contents of `from` into `to` (hidden files included).
///
/// `to` is created if needed; existing files are overwritten. Symlinks are
/// recreated, not followed.
pub fn copy_dir_contents(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| copy_error(from, to, &e))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| copy_error(entry.path(), to, &e))?;
        let dest = to.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            copy_file(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Copy `from` to `to` like `cp -r`: into `to` when it names an existing
/// directory, as `to` otherwise
pub fn copy_recursive(from: &Path, to: &Path) -> Result<PathBuf, FilesystemError> {
    let dest = if to.is_dir() {
        match from.file_name() {
            Some(name) => to.join(name),
            None => to.to_path_buf(),
        }
    } else {
        to.to_path_buf()
    };
    if from.is_dir() {
        copy_dir_contents(from, &dest)?;
    } else {
        copy_file(from, &dest)?;
    }
    Ok(dest)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let target = std::fs::read_link(from).map_err(|e| copy_error(from, to, &e))?;
    remove_all(to)?;
    symlink(&target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    copy_file(from, to)
}

/// Create a symbolic link at `link` pointing to `target`
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> Result<(), FilesystemError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| FilesystemError::Symlink {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        error: e.to_string(),
    })
}

/// Create a symbolic link at `link` pointing to `target`
#[cfg(not(unix))]
pub fn symlink(target: &Path, link: &Path) -> Result<(), FilesystemError> {
    Err(FilesystemError::Symlink {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        error: "symbolic links are not supported on this platform".to_string(),
    })
}

/// Files directly inside `dir` whose names start with `prefix` and end with `suffix`
pub fn matching_files(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>, FilesystemError> {
    let entries = std::fs::read_dir(dir).map_err(|e| FilesystemError::ReadFile {
        path: dir.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(suffix))
        })
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}

fn copy_error(from: &Path, to: &Path, error: &dyn std::fmt::Display) -> FilesystemError {
    FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: error.to_string(),
    }
}
