//! Path preconditions checked before any process is spawned.

use std::path::{Path, PathBuf};

use tracing::{error, trace};

use crate::error::{PreconditionError, Result};
use crate::process::absolute;

/// File extensions kubectl accepts as manifests (compared case-insensitively).
pub const MANIFEST_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// What a [`ValidationTarget`] path must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// An existing regular file.
    File,
    /// An existing directory.
    Directory,
    /// An existing directory holding at least one manifest file.
    ManifestDirectory,
}

/// A path plus the check it must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTarget {
    pub path: PathBuf,
    pub requirement: Requirement,
}

impl ValidationTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requirement: Requirement::File,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requirement: Requirement::Directory,
        }
    }

    pub fn manifest_directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requirement: Requirement::ManifestDirectory,
        }
    }

    /// Run the check and return the absolute path on success.
    pub fn validate(&self) -> Result<PathBuf> {
        let path = absolute(&self.path)?;
        trace!(path = %path.display(), requirement = ?self.requirement, "Validating path");

        let outcome = match self.requirement {
            Requirement::File => check_file(&path),
            Requirement::Directory => check_directory(&path, false),
            Requirement::ManifestDirectory => check_directory(&path, true),
        };

        match outcome {
            Ok(()) => Ok(path),
            Err(err) => {
                error!(error = %err, "Path validation failed");
                Err(err.into())
            }
        }
    }
}

fn check_file(path: &Path) -> std::result::Result<(), PreconditionError> {
    if !path.exists() {
        return Err(PreconditionError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(PreconditionError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn check_directory(
    path: &Path,
    require_manifests: bool,
) -> std::result::Result<(), PreconditionError> {
    if !path.exists() {
        return Err(PreconditionError::DirectoryNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(PreconditionError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    if require_manifests {
        let found = manifest_files(path);
        if found.is_empty() {
            return Err(PreconditionError::NoManifests {
                path: path.to_path_buf(),
            });
        }
        trace!(count = found.len(), dir = %path.display(), "Found manifest files");
    }
    Ok(())
}

/// Whether `path` carries one of [`MANIFEST_EXTENSIONS`].
pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MANIFEST_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

/// Regular files directly inside `dir` with a manifest extension, sorted.
/// An unreadable directory yields an empty list.
pub fn manifest_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_manifest(p))
        .collect();
    files.sort();
    files
}
