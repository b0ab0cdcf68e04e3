//! Process-wide `tracing` setup.
//!
//! Installs up to three layers: console output filtered by `RUST_LOG` (falling
//! back to the configured level), a normal log file at the configured level and
//! a critical log file that only receives errors. Files are named
//! `logs_<name>.log` and `critical_<name>.log` and are written by background
//! workers, so emitting an event never blocks on disk I/O.

use crate::settings::LoggingSettings;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Error installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    #[error("cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the file writers running. Dropping it flushes pending lines and
/// stops the workers, so hold it until the process exits.
#[must_use = "log files stop being written when the guard is dropped"]
#[derive(Debug, Default)]
pub struct LoggingGuard {
    _workers: Vec<WorkerGuard>,
}

/// Paths of the normal and critical log files for `settings`.
pub fn log_file_paths(settings: &LoggingSettings) -> (PathBuf, PathBuf) {
    let dir = settings.directory.clone().unwrap_or_default();
    (
        dir.join(format!("logs_{}.log", settings.name)),
        dir.join(format!("critical_{}.log", settings.name)),
    )
}

/// Install the global subscriber described by `settings`.
pub fn init(settings: &LoggingSettings) -> Result<LoggingGuard, LoggingError> {
    let (subscriber, guard) = subscriber(settings)?;
    subscriber
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    Ok(guard)
}

/// The subscriber [`init`] would install, without installing it.
pub fn subscriber(
    settings: &LoggingSettings,
) -> Result<(impl Subscriber + Send + Sync + use<>, LoggingGuard), LoggingError> {
    let level: LevelFilter = settings
        .level
        .parse()
        .map_err(|_| LoggingError::InvalidLevel(settings.level.clone()))?;
    let (normal_path, critical_path) = log_file_paths(settings);
    let mut guard = LoggingGuard::default();

    let console = settings.console.then(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        fmt::layer().with_filter(filter)
    });

    let normal = if settings.file_normal {
        let (writer, worker) = tracing_appender::non_blocking(open_append(&normal_path)?);
        guard._workers.push(worker);
        Some(fmt::layer().with_ansi(false).with_writer(writer).with_filter(level))
    } else {
        None
    };

    let critical = if settings.file_critical {
        let (writer, worker) = tracing_appender::non_blocking(open_append(&critical_path)?);
        guard._workers.push(worker);
        Some(fmt::layer().with_ansi(false).with_writer(writer).with_filter(LevelFilter::ERROR))
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry().with(console).with(normal).with(critical);
    Ok((subscriber, guard))
}

fn open_append(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_logger_name() {
        let settings = LoggingSettings {
            name: "opc".to_string(),
            directory: Some(PathBuf::from("/var/log/forge")),
            ..LoggingSettings::default()
        };
        let (normal, critical) = log_file_paths(&settings);
        assert_eq!(normal, PathBuf::from("/var/log/forge/logs_opc.log"));
        assert_eq!(critical, PathBuf::from("/var/log/forge/critical_opc.log"));
    }

    #[test]
    fn files_land_in_cwd_without_directory() {
        let (normal, _) = log_file_paths(&LoggingSettings::default());
        assert_eq!(normal, PathBuf::from("logs_smartforge.log"));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let settings = LoggingSettings {
            level: "loud".to_string(),
            console: false,
            ..LoggingSettings::default()
        };
        assert!(matches!(init(&settings), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn files_split_by_severity() {
        let dir = std::env::temp_dir().join(format!("smartforge-logging-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let settings = LoggingSettings {
            name: "split".to_string(),
            console: false,
            file_normal: true,
            file_critical: true,
            directory: Some(dir.clone()),
            level: "info".to_string(),
        };

        let (subscriber, guard) = subscriber(&settings).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("below the level");
            tracing::info!("connected to plc");
            tracing::error!("write failed");
        });
        drop(guard);

        let (normal, critical) = log_file_paths(&settings);
        let normal = std::fs::read_to_string(normal).unwrap();
        let critical = std::fs::read_to_string(critical).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(normal.contains("connected to plc"));
        assert!(normal.contains("write failed"));
        assert!(!normal.contains("below the level"));
        assert!(critical.contains("write failed"));
        assert!(!critical.contains("connected to plc"));
    }
}
