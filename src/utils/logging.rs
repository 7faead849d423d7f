//! Logging configuration and setup
//! 
//! This module provides logging initialization and structured logging utilities
//! for the registration and approval services.

use std::time::Duration;

use tracing::{info, warn, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{CharismError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process when a log directory is configured.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| CharismError::Config(format!("Invalid log filter {}: {}", config.level, e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "charism.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CharismError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event management actions
pub fn log_event_action(event_id: i64, action: &str, actor_id: i64, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        actor_id = actor_id,
        details = details,
        "Event action performed"
    );
}

/// Log approve/disapprove decisions
pub fn log_attendance_decision(event_id: i64, participant_id: i64, approver_id: i64, decision: &str) {
    info!(
        event_id = event_id,
        participant_id = participant_id,
        approver_id = approver_id,
        decision = decision,
        "Attendance decision recorded"
    );
}

/// Log a store call that is about to be retried
pub fn log_store_retry(operation: &str, attempt: u32, backoff: Duration, error: &str) {
    warn!(
        operation = operation,
        attempt = attempt,
        backoff_ms = backoff.as_millis() as u64,
        error = error,
        "Store call failed, retrying"
    );
}

/// Log notification delivery failures
pub fn log_notification_failure(recipient: i64, kind: &str, error: &str) {
    error!(
        recipient = recipient,
        kind = kind,
        error = error,
        "Notification delivery failed"
    );
}
