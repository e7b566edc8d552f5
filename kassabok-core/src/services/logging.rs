//! Logging service - structured event logging to DuckDB
//!
//! Stores privacy-safe events in logs.duckdb. Statement contents
//! (descriptions, amounts, references) and agreement details are never
//! logged; events carry only a name, the command, the file format and
//! error text.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use super::migration::MigrationService;
use crate::log_migrations::LOG_MIGRATIONS;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp in the lower 48 bits, per-millisecond counter in the upper 16
fn generate_id() -> u64 {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms() as u64) << 16) | counter
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Which front-end produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// Related events, grouped by the prefix of their name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFamily {
    /// `statement_parsed`, `statement_parse_failed`
    Statement,
    /// `import_confirmed` and its failure
    Import,
    Agreement,
    Rule,
    /// Category and supplier events
    Catalog,
}

impl EventFamily {
    fn prefixes(&self) -> &'static [&'static str] {
        match self {
            EventFamily::Statement => &["statement_"],
            EventFamily::Import => &["import_"],
            EventFamily::Agreement => &["agreement_"],
            EventFamily::Rule => &["rule_"],
            EventFamily::Catalog => &["category_", "supplier_"],
        }
    }

    fn sql_filter(&self) -> String {
        self.prefixes()
            .iter()
            .map(|p| format!("starts_with(event, '{}')", p))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

impl FromStr for EventFamily {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "statement" | "statements" => Ok(EventFamily::Statement),
            "import" | "imports" => Ok(EventFamily::Import),
            "agreement" | "agreements" => Ok(EventFamily::Agreement),
            "rule" | "rules" => Ok(EventFamily::Rule),
            "catalog" | "category" | "supplier" => Ok(EventFamily::Catalog),
            other => Err(anyhow!(
                "Unknown event family '{}' (statement, import, agreement, rule, catalog)",
                other
            )),
        }
    }
}

/// Statement parse outcomes for one file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatStats {
    pub format: String,
    pub parsed: u64,
    pub failed: u64,
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Statement format, e.g. "spreadsheet" or "delimited"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            format: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub format: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

const SELECT_ENTRIES: &str = "SELECT id, timestamp, entry_point, app_version, platform,
        event, command, format, error_message, error_details
 FROM sys_logs";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in the data directory and migrate it
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event, stamping entry point, version and platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, command, format, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.format,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a failure of a named operation
    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    fn query(&self, filter: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let sql = format!("{} {} ORDER BY id DESC LIMIT ?", SELECT_ENTRIES, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                entry_point: row.get(2)?,
                app_version: row.get(3)?,
                platform: row.get(4)?,
                event: row.get(5)?,
                command: row.get(6)?,
                format: row.get(7)?,
                error_message: row.get(8)?,
                error_details: row.get(9)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query("", limit)
    }

    /// Most recent entries carrying an error
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query("WHERE error_message IS NOT NULL", limit)
    }

    /// Most recent entries of one event family, optionally errors only
    pub fn get_family(&self, family: EventFamily, errors_only: bool, limit: usize) -> Result<Vec<LogEntry>> {
        let mut filter = format!("WHERE ({})", family.sql_filter());
        if errors_only {
            filter.push_str(" AND error_message IS NOT NULL");
        }
        self.query(&filter, limit)
    }

    pub fn count(&self) -> Result<u64> {
        self.count_where("")
    }

    pub fn count_errors(&self) -> Result<u64> {
        self.count_where("WHERE error_message IS NOT NULL")
    }

    fn count_where(&self, filter: &str) -> Result<u64> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM sys_logs {}", filter);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Parsed and failed statement counts per file format
    pub fn format_stats(&self) -> Result<Vec<FormatStats>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT format,
                    COUNT(*) FILTER (WHERE error_message IS NULL),
                    COUNT(*) FILTER (WHERE error_message IS NOT NULL)
             FROM sys_logs
             WHERE ({}) AND format IS NOT NULL
             GROUP BY format
             ORDER BY format",
            EventFamily::Statement.sql_filter()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let parsed: i64 = row.get(1)?;
            let failed: i64 = row.get(2)?;
            Ok(FormatStats {
                format: row.get(0)?,
                parsed: parsed as u64,
                failed: failed as u64,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Delete logs older than a unix-ms timestamp
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
