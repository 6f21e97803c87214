// ============================================================================
// reencode-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: diagnostic logging for a CLI run
//
// By default the `log` facade is routed to a timestamped file under the log
// directory through log4rs (see `reencode_core::setup_file_logging`). With
// `--no-log` nothing is written to disk and warnings go to stderr through
// env_logger instead, so they stay visible next to the progress display.

use crate::error::CliResult;

use log::LevelFilter;
use reencode_core::{CoreError, setup_file_logging};
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// let log_filename = format!("reencode_run_{}.log", reencode::logging::get_timestamp());
/// assert!(log_filename.starts_with("reencode_run_"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Level used for the diagnostic log.
pub fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Path of the diagnostic log file for a run starting now.
pub fn run_log_file(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("reencode_run_{}.log", get_timestamp()))
}

/// Starts file logging under `log_dir` and returns the log file path.
pub fn init_file_logging(log_dir: &Path, verbose: bool) -> CliResult<PathBuf> {
    let path = run_log_file(log_dir);
    setup_file_logging(&path, log_level(verbose)).map_err(|e| {
        CoreError::OperationFailed(format!(
            "Failed to set up log file {}: {e}",
            path.display()
        ))
    })?;
    Ok(path)
}

/// Logs to stderr. Warnings only, unless `verbose`.
pub fn init_console_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // A second init (e.g. in tests) keeps the first logger.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_secs()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_shape() {
        let ts = get_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_run_log_file_name() {
        let path = run_log_file(Path::new("out/logs"));
        assert!(path.starts_with("out/logs"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("reencode_run_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(true), LevelFilter::Debug);
        assert_eq!(log_level(false), LevelFilter::Info);
    }
}
