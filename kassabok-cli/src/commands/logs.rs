//! Logs command - recent kassabok events and statement import health

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;

use super::get_data_dir;
use crate::output::{self, create_table, opt};
use kassabok_core::{EntryPoint, EventFamily, LogEntry, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// statement, import, agreement, rule or catalog
        #[arg(long)]
        family: Option<EventFamily>,
        /// Only failed operations
        #[arg(long)]
        errors: bool,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Statement parse outcomes per file format
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn event_time(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;

    match command {
        LogsCommands::List {
            family,
            errors,
            limit,
            json,
        } => {
            let entries = match (family, errors) {
                (Some(family), errors_only) => log.get_family(family, errors_only, limit)?,
                (None, true) => log.get_errors(limit)?,
                (None, false) => log.get_recent(limit)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No events.");
            } else {
                print_entries(&entries);
            }
        }
        LogsCommands::Stats { json } => {
            let total = log.count()?;
            let failures = log.count_errors()?;
            let formats = log.format_stats()?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "events": total,
                        "failures": failures,
                        "statementFormats": formats,
                        "databasePath": log.db_path().to_string_lossy(),
                    })
                );
                return Ok(());
            }

            println!("{} events, {} failed", total, failures.to_string().red());
            if formats.is_empty() {
                println!("No statements parsed yet.");
            } else {
                let mut table = create_table();
                table.set_header(vec!["Format", "Parsed", "Failed"]);
                for f in &formats {
                    table.add_row(vec![Cell::new(&f.format), Cell::new(f.parsed), Cell::new(f.failed)]);
                }
                println!("{}", table);
            }
            println!("{}", log.db_path().display().to_string().dimmed());
        }
        LogsCommands::Clear {
            older_than_days,
            force,
        } => {
            let prompt = format!("Delete events older than {} days?", older_than_days);
            if !force && !Confirm::new().with_prompt(prompt).default(false).interact()? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }

            let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
            let deleted = log.delete_before(cutoff.timestamp_millis())?;
            output::success(&format!("{} events deleted", deleted));
        }
    }

    Ok(())
}

fn print_entries(entries: &[LogEntry]) {
    let mut table = create_table();
    table.set_header(vec!["Time", "Event", "Command", "Format", "Error"]);
    for e in entries {
        let event = if e.error_message.is_some() {
            e.event.red().to_string()
        } else {
            e.event.clone()
        };
        table.add_row(vec![
            Cell::new(event_time(e.timestamp)),
            Cell::new(event),
            Cell::new(opt(e.command.as_ref())),
            Cell::new(opt(e.format.as_ref())),
            Cell::new(opt(e.error_message.as_ref())),
        ]);
    }
    println!("{}", table);
}
