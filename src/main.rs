//! topicron - topic-broadcasting schedule dispatcher
//!
//! Main entry point for the topicron CLI and scheduler process.

mod app;
mod cli;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topicron_config::{default_config_path, Config, ConfigLoader, ConfigValidator, LoggingConfig};
use topicron_engine::cron;

use crate::app::App;
use crate::cli::{Cli, Commands, CronRecurrence};

/// Initialize tracing with console and rolling file output.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&logging.dir)
        .with_context(|| format!("creating log directory {}", logging.dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("topicron")
        .filename_suffix("log")
        .max_log_files(logging.max_files)
        .build(&logging.dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer on drop, so it must outlive main.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let json_file = logging
        .json
        .then(|| fmt::layer().json().with_writer(non_blocking.clone()));
    let text_file = (!logging.json).then(|| {
        fmt::layer()
            .with_writer(non_blocking.clone())
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(json_file)
        .with(text_file)
        .try_init()?;

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ConfigLoader::load_or_default(&default_config_path())?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(cli.config)?;
            init_tracing(&config.logging)?;
            run(config).await
        }
        Some(Commands::Check) => check(load_config(cli.config)?),
        Some(Commands::Cron { recurrence }) => {
            println!("{}", build_cron(&recurrence)?);
            Ok(())
        }
    }
}

/// Run the scheduler until Ctrl-C.
async fn run(config: Config) -> anyhow::Result<()> {
    info!("Starting topicron v{}", env!("CARGO_PKG_VERSION"));

    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("{}: {}", warning.path, warning.message);
    }

    let app = App::build(&config).await?;
    let cancel = CancellationToken::new();

    let report = app.manager.start(&cancel).await?;
    if report.failed > 0 {
        warn!("{} schedule(s) failed to sync with the engine", report.failed);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(app.runner.clone().run(shutdown_rx));
    info!("topicron ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    cancel.cancel();
    let _ = shutdown_tx.send(true);
    runner.await?;

    info!("Shutting down...");
    Ok(())
}

/// Validate the configuration and print the findings.
fn check(config: Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for e in &result.errors {
        println!("error: {}: {}", e.path, e.message);
    }

    if !result.is_valid() {
        bail!("configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration OK");
    Ok(())
}

fn build_cron(recurrence: &CronRecurrence) -> anyhow::Result<String> {
    let expression = match recurrence {
        CronRecurrence::Daily { at } => cron::daily(*at)?,
        CronRecurrence::Weekdays { at } => cron::week_days(*at)?,
        CronRecurrence::Weekend { at } => cron::weekend_days(*at)?,
        CronRecurrence::Days { at, days } => cron::selected_days(*at, days)?,
        CronRecurrence::Monthly { at, day } => cron::monthly(*day, *at)?,
        CronRecurrence::Yearly { at, month, day } => cron::yearly(*month, *day, *at)?,
    };
    Ok(expression)
}
