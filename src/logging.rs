//! Logging for TutorQueue: a daily-rolling file under the platform data
//! directory plus a compact stderr console.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,tutorqueue=debug";

/// Knobs exposed on the command line.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Level or directive string for this crate, e.g. "trace" or "warn".
    pub level: Option<String>,
    /// Write the log file as JSON lines.
    pub json: bool,
    /// Log directory override.
    pub dir: Option<PathBuf>,
}

/// Install the global subscriber. `RUST_LOG` wins over `options.level`.
///
/// The returned guard must stay alive for the file writer to flush.
pub fn init(options: &LogOptions) -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = match &options.dir {
        Some(dir) => dir.clone(),
        None => get_log_dir()?,
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "tutorqueue.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(options.level.as_deref())));

    let console_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false);

    let subscriber = tracing_subscriber::registry().with(filter).with(console_layer);
    if options.json {
        subscriber
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    tracing::debug!(dir = %log_dir.display(), json = options.json, "Logging initialized");
    Ok((guard, log_dir))
}

/// Filter directives for a requested crate level. Bare levels apply to this
/// crate only; anything else is taken as a full directive string.
fn directives(level: Option<&str>) -> String {
    match level.map(str::trim) {
        None | Some("") => DEFAULT_DIRECTIVES.to_string(),
        Some(l) if matches!(l, "trace" | "debug" | "info" | "warn" | "error") => {
            format!("info,tutorqueue={}", l)
        }
        Some(custom) => custom.to_string(),
    }
}

fn get_log_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "tutorqueue", "tutorqueue")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    Ok(dirs.data_dir().join("logs"))
}

/// Route test logs through the test harness capture.
#[cfg(test)]
pub fn init_test() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}
