//! TaskFlow CLI
//!
//! Drives the session and project stores from the terminal.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod output;
mod settings;

use commands::Cli;
use settings::Settings;

/// Initialize tracing with optional file logging.
///
/// Console output goes to stderr so it never mixes with command output. The
/// returned guard flushes the log file and must live until exit.
fn init_tracing(log_file: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose { "taskflow=debug" } else { "taskflow=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let file = log_file.and_then(|path| {
        let dir = path.parent()?;
        let name = path.file_name()?;
        let _ = std::fs::create_dir_all(dir);
        Some(tracing_appender::non_blocking(
            tracing_appender::rolling::never(dir, name),
        ))
    });

    match file {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir()?;
    let settings = Settings::load(&data_dir)?;

    let log_file = settings.log_file.as_ref().map(|p| data_dir.join(p));
    let _log_guard = init_tracing(log_file.as_deref(), cli.verbose);

    cli.execute(&data_dir, &settings).await
}
