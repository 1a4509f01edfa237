use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "learnquest.log";

/// Keeps the background file writer alive; dropping it flushes pending lines.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// under `config.dir` when file logging is enabled and the directory is usable.
pub fn init_tracing(config: &LogConfig) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}; falling back to info", config.level);
        EnvFilter::new("info")
    });
    let stdout_layer = fmt::layer().with_target(true);

    let file_writer = if config.file_enabled {
        open_log_dir(config)
    } else {
        None
    };
    let Some((writer, guard)) = file_writer else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();
        return None;
    };

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!(log_dir = %config.dir.display(), "file logging enabled");
    Some(FileLogGuard { _guard: guard })
}

fn open_log_dir(
    config: &LogConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(&config.dir) {
        eprintln!("failed to create log directory {}: {err}", config.dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
