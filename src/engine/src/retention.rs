//! Retention of rotated copies.
//!
//! A retention family is every regular file named `<base>.*` in the base
//! file's directory, which covers both plain rotated copies and compressed
//! ones. The family is listed from the filesystem on every prune.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

/// One rotated or compressed sibling of a base file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Outcome of a prune over one family.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Members found before pruning.
    pub family_size: usize,
    pub removed: Vec<PathBuf>,
    pub bytes_reclaimed: u64,
    pub failures: Vec<Error>,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// List the family of `base_name` in `dir`, oldest first.
///
/// Ordering is by modification time, then by file name, so members rotated
/// within the same second still sort by their timestamp suffix. Entries that
/// cannot be read are returned as failures and left out of the family.
///
/// Names are compared as raw OS strings, so non-UTF-8 file names match too.
pub fn list_family(
    dir: &Path,
    base_name: impl AsRef<OsStr>,
) -> Result<(Vec<FamilyMember>, Vec<Error>)> {
    let mut prefix = base_name.as_ref().as_encoded_bytes().to_vec();
    prefix.push(b'.');
    let entries = fs::read_dir(dir).map_err(|e| Error::retention(dir, e))?;

    let mut members = Vec::new();
    let mut failures = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                failures.push(Error::retention(dir, e));
                continue;
            }
        };

        if !entry.file_name().as_encoded_bytes().starts_with(&prefix) {
            continue;
        }

        let path = entry.path();
        let (metadata, modified) =
            match entry.metadata().and_then(|m| m.modified().map(|t| (m, t))) {
                Ok(found) => found,
                Err(e) => {
                    failures.push(Error::retention(&path, e));
                    continue;
                }
            };
        if !metadata.is_file() {
            continue;
        }

        members.push(FamilyMember {
            path,
            modified,
            size: metadata.len(),
        });
    }

    members.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
    });

    Ok((members, failures))
}

/// Members that a prune with `max_keep` would remove, oldest first.
pub fn plan(members: &[FamilyMember], max_keep: usize) -> &[FamilyMember] {
    let excess = members.len().saturating_sub(max_keep);
    &members[..excess]
}

/// Remove the oldest members of the family until at most `max_keep` remain.
///
/// Failures are collected per member; remaining removals are still attempted.
pub fn prune(dir: &Path, base_name: impl AsRef<OsStr>, max_keep: usize) -> PruneReport {
    let base_name = base_name.as_ref();
    let mut report = PruneReport::default();

    let (members, failures) = match list_family(dir, base_name) {
        Ok(listed) => listed,
        Err(e) => {
            tracing::error!(
                dir = %dir.display(),
                base = ?base_name,
                error = %e,
                "Failed to list rotated files"
            );
            report.failures.push(e);
            return report;
        }
    };
    report.family_size = members.len();
    report.failures = failures;

    remove_members(plan(&members, max_keep), &mut report);
    report
}

/// Remove each member in turn. A failed removal is recorded and the rest
/// are still attempted.
fn remove_members(members: &[FamilyMember], report: &mut PruneReport) {
    for member in members {
        match fs::remove_file(&member.path) {
            Ok(()) => {
                tracing::info!(
                    path = %member.path.display(),
                    size_bytes = member.size,
                    "Removed old rotated file"
                );
                report.bytes_reclaimed += member.size;
                report.removed.push(member.path.clone());
            }
            Err(e) => {
                tracing::error!(
                    path = %member.path.display(),
                    error = %e,
                    "Failed to remove old rotated file"
                );
                report.failures.push(Error::retention(&member.path, e));
            }
        }
    }
}
