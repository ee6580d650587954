use anyhow::{Context, Result};
use clap::Parser;
use common::cli::{CommonArgs, CommonCommands, utils};
use common::logging::{LogSink, init_logging};
use common::paths::RuntimePaths;
use engine::{Dispatcher, EngineContext, TickOutcome};

#[derive(Parser)]
#[command(name = "logrotor")]
#[command(about = "logrotor - scheduled log deletion, rotation and retention")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => log::info!("Received SIGINT"),
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        log::info!("Received Ctrl+C");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_default();

    if command == CommonCommands::Version {
        println!("{}", utils::version_info());
        return Ok(());
    }

    let paths = RuntimePaths::discover(&cli.common)?;

    // The log file must be writable before anything else happens
    let sink = LogSink::open(&paths.log_path)?;
    init_logging(&cli.common, &sink)?;

    let config = utils::load_config(&paths.config_path)?;

    // Handle commands that don't require the scheduler
    if utils::handle_common_command(&command, &config)? {
        return Ok(());
    }

    log::info!(
        "Starting logrotor with {} entries (log file: {})",
        config.logs.len(),
        sink.path().display()
    );
    if config.dry_run {
        log::info!("Dry-run mode enabled, no files will be modified");
    }

    let dispatcher = Dispatcher::new(EngineContext::new(config));

    if command == CommonCommands::Once {
        let outcomes = dispatcher.run_once().await;
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, TickOutcome::Skipped))
            .count();
        log::info!(
            "Single run finished: {} entries ran, {} skipped",
            outcomes.len() - skipped,
            skipped
        );
        dispatcher.context().metrics().summary().log();
        return Ok(());
    }

    let handle = dispatcher.start();
    if !handle.failures().is_empty() {
        log::warn!(
            "{} of {} entries could not be scheduled",
            handle.failures().len(),
            dispatcher.tasks().len()
        );
    }

    log::info!(
        "logrotor running with {} scheduled entries, waiting for shutdown signal",
        handle.scheduled()
    );
    wait_for_shutdown_signal().await?;

    log::info!("Received shutdown signal, stopping scheduler");
    handle.shutdown();
    dispatcher.context().metrics().summary().log();

    log::info!("logrotor stopped");

    Ok(())
}
