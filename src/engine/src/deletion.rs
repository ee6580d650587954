//! Removal of files that qualify for a delete entry.

use std::fs;
use std::path::PathBuf;

use crate::context::EngineContext;
use crate::error::Error;
use crate::resolver::ResolvedFile;

/// Result of a deletion batch.
#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Files removed (or that would be removed in dry-run mode).
    pub deleted: Vec<PathBuf>,
    pub bytes_freed: u64,
    pub failures: Vec<Error>,
}

pub struct DeletionExecutor {
    dry_run: bool,
}

impl DeletionExecutor {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            dry_run: ctx.dry_run(),
        }
    }

    /// Delete every file in `files`.
    ///
    /// A failed removal is logged and recorded; the rest of the batch is
    /// still processed.
    pub fn execute(&self, files: &[ResolvedFile]) -> DeletionReport {
        let mut report = DeletionReport::default();

        for file in files {
            if self.dry_run {
                tracing::info!(
                    path = %file.path.display(),
                    size_bytes = file.size,
                    "[DRY-RUN] Would delete file"
                );
                report.deleted.push(file.path.clone());
                report.bytes_freed += file.size;
                continue;
            }

            match fs::remove_file(&file.path) {
                Ok(()) => {
                    tracing::info!(
                        path = %file.path.display(),
                        size_bytes = file.size,
                        "Deleted file"
                    );
                    report.deleted.push(file.path.clone());
                    report.bytes_freed += file.size;
                }
                Err(e) => {
                    tracing::error!(
                        path = %file.path.display(),
                        error = %e,
                        "Failed to delete file"
                    );
                    report.failures.push(Error::io(&file.path, e));
                }
            }
        }

        report
    }
}
