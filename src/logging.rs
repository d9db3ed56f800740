//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and to a JSON log file
//! under `log/`, for following concurrent batch writes after the fact.

use crate::constants::env as env_vars;
use crate::repository::WriteReport;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

/// Keeps the file writer flushing for the life of the process
static LOGGER_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// `RUST_LOG` overrides the environment's default level.
pub fn init_structured_logging() {
    LOGGER_GUARD.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        let pid = process::id();
        let log_filename = format!(
            "{}.{}.{}.log",
            environment,
            pid,
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        // Fall back to console-only output when the log directory is unusable
        let (file_layer, guard) = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(filter());
                (Some(layer), Some(guard))
            }
            Err(_) => (None, None),
        };

        // A global subscriber may already be installed by the host application
        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_output = guard.is_some(),
            "🔧 STRUCTURED LOGGING: Initialized"
        );

        guard
    });
}

/// Current environment: TABLE_REPOSITORY_ENV || APP_ENV || 'development'
fn get_environment() -> String {
    std::env::var(env_vars::ENVIRONMENT)
        .or_else(|_| std::env::var(env_vars::ENVIRONMENT_FALLBACK))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log the outcome of one bulk write
pub fn log_write_summary(table: &str, report: &WriteReport) {
    if report.is_success() {
        tracing::info!(
            table = %table,
            batches = report.batch_count(),
            entities = report.written_entity_count(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "✅ WRITE_SUMMARY"
        );
    } else {
        tracing::warn!(
            table = %table,
            batches = report.batch_count(),
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            entities = report.written_entity_count(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "⚠️ WRITE_SUMMARY: incomplete"
        );
    }
}

/// Log structured data for queue operations
pub fn log_queue_operation(operation: &str, queue: &str, message_id: Option<Uuid>, payload_bytes: usize) {
    tracing::debug!(
        operation = %operation,
        queue = %queue,
        message_id = message_id.map(|id| id.to_string()),
        payload_bytes = payload_bytes,
        timestamp = %Utc::now().to_rfc3339(),
        "📨 QUEUE_OPERATION"
    );
}
