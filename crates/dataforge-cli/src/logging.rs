use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::Verbosity;

/// Install the global log subscriber.
///
/// The filter comes from `DATAFORGE_LOG`, then `RUST_LOG`, and otherwise
/// defaults to `warn` (`info` with `--verbose`). Logs go to stderr so stdout
/// carries only tool output, unless `log_dir` is given, in which case they
/// are written to `dataforge-run.YYYY-MM-DD` files there.
///
/// The returned [`WorkerGuard`] must be held until exit so buffered file
/// records are flushed.
pub fn init(verbosity: Verbosity, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbosity {
        Verbosity::Verbose => "info",
        Verbosity::Normal | Verbosity::Quiet => "warn",
    };
    let env_filter = EnvFilter::try_from_env("DATAFORGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(env_filter)
            .try_init()
            .context("failed to install log subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(dir, "dataforge-run");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .with(env_filter)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(Some(guard))
}
