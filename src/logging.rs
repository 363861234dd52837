use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; drop it last.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Directive used when `RUST_LOG` is unset.
fn default_directive(level: &str) -> String {
    format!("project_picker={}", level.trim().to_lowercase())
}

/// Route `tracing` events to a daily rolling file under `log_dir`.
///
/// Logs never go to the terminal, which belongs to the UI. Returns `None`
/// if the directory cannot be created or a subscriber is already set.
pub fn init(log_dir: Option<PathBuf>, level: &str) -> Option<LoggingGuard> {
    let log_dir = log_dir
        .and_then(|dir| std::fs::create_dir_all(&dir).map(|_| dir).ok())
        .or_else(|| {
            let dir = std::env::temp_dir().join("project-picker").join("logs");
            std::fs::create_dir_all(&dir).ok()?;
            Some(dir)
        })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "project-picker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directive("info")));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_targets_this_crate() {
        assert_eq!(default_directive(" DEBUG "), "project_picker=debug");
        assert!(EnvFilter::try_new(default_directive("warn")).is_ok());
    }
}
