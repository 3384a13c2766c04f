//! Tracing configuration and log routing.
//!
//! Interactive sessions share stdout with the REPL, so the console layer only shows warnings
//! and above unless `RUST_LOG` says otherwise; the file layer receives everything the filter
//! allows. When `PORTFOLIO_RAG_LOG_FILE` is set, logs are appended to that path; otherwise a
//! file logger is created under `logs/portfolio-rag.log`.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where console output should be routed for the current run mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleVerbosity {
    /// REPL mode: keep the terminal for answers, surface only warnings.
    Quiet,
    /// Server mode: mirror the filtered log stream to stdout.
    Full,
}

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Uses a global guard to keep the non-blocking writer alive for the process lifetime.
pub fn init_tracing(verbosity: ConsoleVerbosity) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_level = match verbosity {
        ConsoleVerbosity::Quiet if std::env::var("RUST_LOG").is_err() => LevelFilter::WARN,
        _ => LevelFilter::TRACE,
    };
    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(console_level);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "portfolio-rag.log";

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the target file cannot be opened; console logging still works.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = log_file_path();
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
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
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

fn log_file_path() -> PathBuf {
    std::env::var("PORTFOLIO_RAG_LOG_FILE")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
}
