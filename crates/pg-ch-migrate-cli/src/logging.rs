//! Subscriber setup: every record goes to stdout and to a per-run log file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

fn parse_level(verbosity: &str) -> Level {
    match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber and return the path of the run's log file,
/// `<log_dir>/migration_<YYYYMMDD_HHMMSS>.log`.
///
/// `RUST_LOG` overrides `verbosity` when set.
pub fn setup_logging(verbosity: &str, format: LogFormat, log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("cannot create log directory {}: {}", log_dir.display(), e))?;
    let path = log_dir.join(format!(
        "migration_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = Arc::new(
        File::create(&path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?,
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(verbosity).as_str()));
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| fmt::layer().with_target(false)))
        .with(json.then(|| fmt::layer().json().with_target(false)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file.clone())
        }))
        .with(json.then(|| fmt::layer().json().with_target(false).with_writer(file.clone())))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok(path)
}
