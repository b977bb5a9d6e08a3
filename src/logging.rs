use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Suffix of every log file name
pub const LOG_SUFFIX: &str = "log";

/// Build the daily rotating file appender described by `settings`.
///
/// Files are named `<prefix>.<date>.log`; at most `max_files` are kept.
pub fn file_appender(settings: &LoggingSettings) -> Result<RollingFileAppender> {
    if !settings.dir.exists() {
        fs::create_dir_all(&settings.dir)
            .with_context(|| format!("Failed to create log directory: {}", settings.dir))?;
    }

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&settings.prefix)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(settings.max_files.max(1))
        .build(&settings.dir)
        .with_context(|| format!("Failed to create log appender in {}", settings.dir))
}

/// Setup logging with rotating file appender and optional console output.
///
/// # Arguments
/// * `settings` - Log directory, file prefix, retention, level and console switch
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(settings: &LoggingSettings) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(settings)?);

    // RUST_LOG wins over the configured level
    let default_level = if settings.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, max_files={}, debug={}, console={}",
        settings.dir,
        settings.prefix,
        settings.max_files,
        settings.debug,
        settings.console
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;
    use tempfile::TempDir;

    fn settings(temp: &TempDir) -> LoggingSettings {
        LoggingSettings {
            dir: Utf8PathBuf::from_path_buf(temp.path().join("logs")).unwrap(),
            prefix: "test".to_string(),
            ..LoggingSettings::default()
        }
    }

    #[test]
    fn test_appender_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let settings = settings(&temp);

        let mut appender = file_appender(&settings).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        assert!(settings.dir.is_dir());
        let names: Vec<String> = fs::read_dir(&settings.dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("test."));
        assert!(names[0].ends_with(".log"));
    }
}
