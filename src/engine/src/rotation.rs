//! Rename, compress and prune files that qualify for a rotate entry.
//!
//! Each file is handled on its own: a failed rename skips compression and
//! pruning for that file only, and a failed compression keeps the renamed
//! copy on disk and still runs retention.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use common::Condition;

use crate::compress::{CompressionFormat, compress};
use crate::context::EngineContext;
use crate::error::Error;
use crate::resolver::ResolvedFile;
use crate::retention;

/// Suffix format appended to rotated files, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// What happened to one rotated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedFile {
    pub source: PathBuf,
    pub rotated: PathBuf,
    /// Compressed artifact, when compression ran and succeeded.
    pub artifact: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RotationReport {
    pub rotated: Vec<RotatedFile>,
    pub compressed: usize,
    pub pruned: Vec<PathBuf>,
    pub bytes_reclaimed: u64,
    pub failures: Vec<Error>,
}

pub struct RotationExecutor {
    dry_run: bool,
}

impl RotationExecutor {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            dry_run: ctx.dry_run(),
        }
    }

    /// Rotate every file in `files` according to `condition`.
    pub fn execute(&self, files: &[ResolvedFile], condition: &Condition) -> RotationReport {
        let mut report = RotationReport::default();
        for file in files {
            self.rotate_one(file, condition, Local::now(), &mut report);
        }
        report
    }

    /// Same as [`execute`](Self::execute) with a fixed rotation instant.
    pub fn execute_at(
        &self,
        files: &[ResolvedFile],
        condition: &Condition,
        now: DateTime<Local>,
    ) -> RotationReport {
        let mut report = RotationReport::default();
        for file in files {
            self.rotate_one(file, condition, now, &mut report);
        }
        report
    }

    fn rotate_one(
        &self,
        file: &ResolvedFile,
        condition: &Condition,
        now: DateTime<Local>,
        report: &mut RotationReport,
    ) {
        let source = &file.path;
        let rotated = rotated_path(source, &now);

        if self.dry_run {
            self.log_dry_run(file, &rotated, condition);
            report.rotated.push(RotatedFile {
                source: source.clone(),
                rotated,
                artifact: None,
            });
            return;
        }

        if let Err(e) = fs::rename(source, &rotated) {
            tracing::error!(
                path = %source.display(),
                rotated = %rotated.display(),
                error = %e,
                "Failed to rotate log file"
            );
            report.failures.push(Error::io(source, e));
            return;
        }
        tracing::info!(
            path = %source.display(),
            rotated = %rotated.display(),
            size_bytes = file.size,
            "Rotated log file"
        );

        let mut artifact = None;
        if condition.compress_enabled() {
            match compress(&rotated, condition.compression_tag()) {
                Ok(path) => {
                    tracing::info!(
                        path = %rotated.display(),
                        artifact = %path.display(),
                        "Compressed rotated log file"
                    );
                    report.compressed += 1;
                    artifact = Some(path);
                }
                Err(e) => {
                    tracing::error!(
                        path = %rotated.display(),
                        error = %e,
                        "Failed to compress rotated log file"
                    );
                    report.failures.push(e);
                }
            }
        }

        report.rotated.push(RotatedFile {
            source: source.clone(),
            rotated,
            artifact,
        });

        if let Some(max_keep) = condition.max_keep {
            let (dir, base_name) = family_of(source);
            let pruned = retention::prune(dir, base_name, max_keep);
            report.bytes_reclaimed += pruned.bytes_reclaimed;
            report.pruned.extend(pruned.removed);
            report.failures.extend(pruned.failures);
        }
    }

    fn log_dry_run(&self, file: &ResolvedFile, rotated: &Path, condition: &Condition) {
        tracing::info!(
            path = %file.path.display(),
            rotated = %rotated.display(),
            size_bytes = file.size,
            "[DRY-RUN] Would rotate log file"
        );

        if condition.compress_enabled() {
            match condition.compression_tag().parse::<CompressionFormat>() {
                Ok(format) => tracing::info!(
                    path = %rotated.display(),
                    artifact = %format.artifact_path(rotated).display(),
                    "[DRY-RUN] Would compress rotated log file"
                ),
                Err(e) => tracing::warn!(
                    path = %rotated.display(),
                    error = %e,
                    "[DRY-RUN] Compression would fail"
                ),
            }
        }

        if let Some(max_keep) = condition.max_keep {
            let (dir, base_name) = family_of(&file.path);
            match retention::list_family(dir, base_name) {
                Ok((members, _)) => {
                    // The copy about to be created counts towards the limit.
                    for member in retention::plan(&members, max_keep.saturating_sub(1)) {
                        tracing::info!(
                            path = %member.path.display(),
                            size_bytes = member.size,
                            "[DRY-RUN] Would remove old rotated file"
                        );
                    }
                }
                Err(e) => tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "[DRY-RUN] Could not list rotated files"
                ),
            }
        }
    }
}

/// `<path>.<timestamp>`, disambiguated with `_1`, `_2`, … when a rotated or
/// compressed file with that name already exists.
pub fn rotated_path(path: &Path, now: &DateTime<Local>) -> PathBuf {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();

    let mut candidate = with_suffix(path, &stamp);
    let mut counter = 1u32;
    while is_taken(&candidate) {
        candidate = with_suffix(path, &format!("{stamp}_{counter}"));
        counter += 1;
    }
    candidate
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn is_taken(candidate: &Path) -> bool {
    let exists = |p: &Path| fs::symlink_metadata(p).is_ok();
    exists(candidate)
        || exists(&CompressionFormat::Gzip.artifact_path(candidate))
        || exists(&CompressionFormat::Zip.artifact_path(candidate))
}

/// Directory and base name that scope retention for `path`.
fn family_of(path: &Path) -> (&Path, &OsStr) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    (dir, path.file_name().unwrap_or_default())
}
