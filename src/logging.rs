//! Tracing configuration and log routing.
//!
//! Stdout gets a compact formatter. Import and sync events are also appended to a file:
//! `CATALOG_SYNC_LOG_FILE` when set, `logs/catalog-sync.log` otherwise. Set
//! `CATALOG_SYNC_LOG_FILE=off` to disable the file layer.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` controls filtering (default
/// `info,tower_http=warn`). Calling this twice keeps the first subscriber.
pub fn init_tracing() {
    if let Err(err) = install(configure_file_writer()) {
        tracing::debug!(error = %err, "Tracing subscriber already installed");
    }
}

fn install(file_writer: Option<NonBlocking>) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = file_writer {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).try_init()
    } else {
        registry.try_init()
    }
}

/// Returns `None` when file logging is disabled or the target cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    if let Ok(path) = std::env::var("CATALOG_SYNC_LOG_FILE") {
        if path.eq_ignore_ascii_case("off") {
            return None;
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                None
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all("logs") {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        let file_appender = tracing_appender::rolling::never("logs", "catalog-sync.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(non_blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_existing_subscriber() {
        let _ = install(None);
        assert!(install(None).is_err());
    }
}
