//! CLI command implementations

pub mod agreements;
pub mod catalog;
pub mod entries;
pub mod import;
pub mod logs;
pub mod rules;

use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{Context, Result};
use kassabok_core::{EntryPoint, LogEvent, LoggingService, KassabokContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log `event` on success or `<event>_failed` with the error message
pub fn log_outcome<T, E: Display>(
    logger: &Option<LoggingService>,
    event: &str,
    command: &str,
    result: &std::result::Result<T, E>,
) {
    let entry = match result {
        Ok(_) => LogEvent::new(event),
        Err(e) => LogEvent::new(format!("{}_failed", event)).with_error(e.to_string()),
    };
    log_event(logger, entry.with_command(command));
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("KASSABOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".kassabok"))
}

/// Get or create the kassabok context
pub fn get_context() -> Result<KassabokContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    KassabokContext::new(&data_dir).context("Failed to initialize kassabok context")
}

/// The `--user` flag, falling back to the configured default user
pub fn resolve_user(ctx: &KassabokContext, user: Option<i64>) -> i64 {
    user.unwrap_or(ctx.config.default_user_id)
}
