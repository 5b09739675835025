use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Environment variable that overrides the log filter
pub const LOG_ENV: &str = "TIDYGUARD_LOG";

/// Install the global tracing subscriber.
///
/// Console output goes to stderr at `warn` (or `debug` with `--verbose`);
/// `TIDYGUARD_LOG` overrides both. When `log_dir` is given, a daily rolling
/// file receives the same events at `info` or above. Keep the returned guard
/// alive for the life of the process so buffered lines get flushed.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "tidyguard=debug" } else { "tidyguard=warn" };
    let console_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(console)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, "tidyguard.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(EnvFilter::new("tidyguard=info"));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}
