//! Subscriber set-up: terminal, rolling background file, optional debug
//! file, and the Discord relay.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use concord_core::{ConcordError, Result};
use concord_runtime::LogRelay;

/// Background log files kept before the oldest is removed.
pub const BACKGROUND_LOG_FILES: usize = 28;

/// Flushes the file appenders when dropped. Keep it alive until exit.
#[must_use]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

pub fn background_log_prefix(bot_name: &str) -> String {
    format!("{bot_name}.background")
}

pub fn debug_log_name(bot_name: &str) -> String {
    format!("{bot_name}.log")
}

/// Install the global subscriber.
pub fn init(logs_dir: &Path, bot_name: &str, is_debug: bool, relay: &LogRelay) -> Result<LogGuards> {
    std::fs::create_dir_all(logs_dir)?;
    let mut guards = Vec::new();

    let default_level = if is_debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    let background_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(background_log_prefix(bot_name))
        .filename_suffix("log")
        .max_log_files(BACKGROUND_LOG_FILES)
        .build(logs_dir)
        .map_err(|e| ConcordError::Other(anyhow::anyhow!("background log: {e}")))?;
    let (background_writer, guard) = tracing_appender::non_blocking(background_appender);
    guards.push(guard);
    let background = fmt::layer()
        .with_writer(background_writer)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let debug = if is_debug {
        let appender = tracing_appender::rolling::never(logs_dir, debug_log_name(bot_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(background)
        .with(debug)
        .with(relay.layer())
        .try_init()
        .map_err(|e| ConcordError::Other(anyhow::anyhow!("logging already initialised: {e}")))?;

    Ok(LogGuards { _guards: guards })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_names_follow_bot_name() {
        assert_eq!(background_log_prefix("testbot"), "testbot.background");
        assert_eq!(debug_log_name("testbot"), "testbot.log");
    }
}
