use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arguments shared by every logrotor command
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Log output file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum CommonCommands {
    /// Run the scheduler until interrupted (default behavior)
    #[default]
    Start,
    /// Run every entry once and exit
    Once,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use std::path::Path;

    /// Filter directive derived from `--verbose` / `--quiet`.
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn load_config(config_path: &Path) -> Result<Configuration> {
        log::info!("Loading configuration from: {}", config_path.display());
        Configuration::load_from_path(config_path).context("Failed to load configuration")
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("logrotor configuration:");
            println!("=======================");
            println!("Default schedule: {}", config.schedule);
            println!("Dry run: {}", config.dry_run);
            println!("Entries: {}", config.logs.len());

            for (idx, entry) in config.logs.iter().enumerate() {
                println!();
                println!("[{idx}] {} {}", entry.action, entry.paths);
                println!("    schedule: {}", config.schedule_for(entry));
                if let Some(condition) = &entry.condition {
                    if let Some(age) = &condition.age {
                        println!("    age: {age}");
                    }
                    if let Some(size) = &condition.size {
                        println!("    size: {size}");
                    }
                    if let Some(max_keep) = condition.max_keep {
                        println!("    max_keep: {max_keep}");
                    }
                    println!(
                        "    compress: {} ({})",
                        condition.compress_enabled(),
                        condition.compression_tag()
                    );
                }
            }
        }
        Ok(())
    }

    /// Handle commands that don't require starting the scheduler.
    ///
    /// Returns `true` when the command was fully handled.
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(true)
            }
            CommonCommands::Start | CommonCommands::Once => Ok(false),
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "logrotor {} (rust {})",
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}
