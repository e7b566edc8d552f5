//! Kassabok CLI - bank statements and recurring agreements in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{agreements, catalog, entries, import, logs, rules};

/// Kassabok - household bookkeeping from bank statements
#[derive(Parser)]
#[command(name = "kb", version, about, long_about = None)]
struct Cli {
    /// User to act as (defaults to user.defaultUserId in settings.json)
    #[arg(long, global = true, env = "KASSABOK_USER")]
    user: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview a bank statement, optionally importing it
    Import {
        /// Path to the statement (.xlsx, .xls or .csv)
        file: PathBuf,
        /// Write every non-duplicate transaction that has a suggestion
        #[arg(long)]
        confirm: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage import rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Manage recurring agreements
    Agreements {
        #[command(subcommand)]
        command: agreements::AgreementsCommands,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: catalog::CategoriesCommands,
    },

    /// Manage suppliers
    Suppliers {
        #[command(subcommand)]
        command: catalog::SuppliersCommands,
    },

    /// List ledger entries
    Entries {
        /// Only entries for this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KASSABOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let user = cli.user;
    match cli.command {
        Commands::Import { file, confirm, yes, json } => import::run(&file, user, confirm, yes, json),
        Commands::Rules { command } => rules::run(command, user),
        Commands::Agreements { command } => agreements::run(command, user),
        Commands::Categories { command } => catalog::run_categories(command),
        Commands::Suppliers { command } => catalog::run_suppliers(command),
        Commands::Entries { month, json } => entries::run(user, month, json),
        Commands::Logs { command } => logs::run(command),
    }
}
