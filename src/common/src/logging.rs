//! Append-only log output for the daemon.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{CommonArgs, utils::log_level};

/// Handle on the log destination file.
///
/// Opened once at startup and kept by the caller for the process lifetime.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: File,
}

impl LogSink {
    /// Open `path` for appending, creating the parent directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> Result<Mutex<File>> {
        let file = self
            .file
            .try_clone()
            .with_context(|| format!("Failed to clone log file handle {}", self.path.display()))?;
        Ok(Mutex::new(file))
    }
}

/// Install the global subscriber writing to `sink`.
///
/// `RUST_LOG` takes precedence over the level implied by the CLI flags.
pub fn init_logging(args: &CommonArgs, sink: &LogSink) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(args)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(sink.writer()?)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))
}
