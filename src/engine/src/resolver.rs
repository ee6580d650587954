//! Glob expansion into the files present at evaluation time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

/// A matched file with the metadata the condition evaluator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl ResolvedFile {
    /// Stat `path`. Returns `Ok(None)` for anything that isn't a regular file.
    pub fn stat(path: &Path) -> Result<Option<Self>> {
        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let modified = metadata.modified().map_err(|e| Error::io(path, e))?;
        Ok(Some(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
        }))
    }
}

/// Expand a shell-style glob pattern.
///
/// An empty match is an empty list. Only a malformed pattern is an error;
/// entries that cannot be read while walking are logged and skipped. Callers
/// must not rely on the order of the returned paths.
pub fn resolve(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|source| Error::Glob {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => {
                tracing::warn!(
                    pattern = %pattern,
                    path = %e.path().display(),
                    error = %e.error(),
                    "Skipping unreadable glob match"
                );
            }
        }
    }

    Ok(matches)
}
