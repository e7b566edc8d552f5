//! Kassabok Core - bank statement import and recurring agreements
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (statement rows, rules, agreements, ledger entries)
//! - **ports**: Trait definitions for storage (ledger, rules, catalog, agreements)
//! - **services**: Extraction, normalization, matching and orchestration
//! - **adapters**: Concrete implementations (DuckDB)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Agreement, AgreementDraft, AgreementStatus, CanonicalTransaction, Category, CellValue,
    EntryType, Frequency, ImportPreview, ImportRule, ImportSelection, ImportSummary, LedgerEntry,
    RowRecord, RuleUpdate, Supplier,
};
pub use domain::result::Error;
pub use config::AgreementUpdatePolicy;
pub use services::{EntryPoint, EventFamily, FormatStats, LogEntry, LogEvent, LoggingService};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "kassabok.duckdb";

/// Main context for Kassabok operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct KassabokContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub rule_service: RuleService,
    pub agreement_service: AgreementService,
    pub catalog_service: CatalogService,
}

impl KassabokContext {
    /// Open the database in `data_dir` and wire up the services
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);

        // Initialize schema
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, repository))
    }

    /// Wire services around an already opened repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Self {
        let import_service = ImportService::new(
            repository.clone(),
            repository.clone(),
            repository.clone(),
        )
        .with_extractor(TabularExtractor::new(config.csv_delimiter))
        .with_rule_order(config.rule_order);
        let rule_service = RuleService::new(repository.clone());
        let agreement_service = AgreementService::new(
            repository.clone(),
            repository.clone(),
            config.agreement_update_policy,
        );
        let catalog_service = CatalogService::new(repository.clone());

        Self {
            config,
            repository,
            import_service,
            rule_service,
            agreement_service,
            catalog_service,
        }
    }
}
