use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const LOG_ENV: &str = "PATCHTRAIL_LOG";

/// Sends `tracing` output to the configured log file, truncated per run.
///
/// Logging is best effort: if the file can't be opened nothing is installed
/// and the run carries on silently.
pub fn init(config: &LogConfig) {
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&config.file)
    {
        Ok(file) => file,
        Err(_) => return,
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
}
