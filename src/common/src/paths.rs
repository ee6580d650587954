//! Locations the daemon reads its configuration from and writes its log to.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::CommonArgs;

pub const CONFIG_DIR: &str = "configs";
pub const CONFIG_FILE: &str = "logrotor.yaml";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "logrotor.log";

/// Resolved configuration and log paths.
///
/// Both default to locations next to the running executable so the daemon
/// behaves the same regardless of the working directory it is started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl RuntimePaths {
    /// Resolve paths from CLI overrides, falling back to the executable directory.
    pub fn discover(args: &CommonArgs) -> Result<Self> {
        let exe_dir = executable_dir()?;
        Ok(Self::resolve(args, &exe_dir))
    }

    pub fn resolve(args: &CommonArgs, base_dir: &Path) -> Self {
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| base_dir.join(CONFIG_DIR).join(CONFIG_FILE));
        let log_path = args
            .log_file
            .clone()
            .unwrap_or_else(|| base_dir.join(LOG_DIR).join(LOG_FILE));

        Self {
            config_path,
            log_path,
        }
    }
}

/// Directory containing the running executable.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to determine executable path")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("Executable path {} has no parent", exe.display()))
}
