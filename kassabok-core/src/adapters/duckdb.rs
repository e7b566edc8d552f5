//! DuckDB repository implementation
//!
//! One connection behind a mutex implements every repository port.
//! Batch writes (ledger batches, agreement create/replace/delete) run in
//! a single transaction and roll back on any error.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result as AnyResult};
use chrono::{DateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    format_display_id, Agreement, AgreementStatus, Category, EntryType, Frequency, ImportRule,
    LedgerEntry, LedgerEntryDraft, NewImportRule, RuleOrder, Supplier,
};
use crate::ports::{AgreementRepository, CatalogRepository, LedgerRepository, RuleRepository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

const ENTRY_COLUMNS: &str = "entry_id, display_id, user_id, name, amount, entry_type, currency,
        month, category_id, supplier_id, agreement_id, notes, created_at";

const RULE_COLUMNS: &str = "rule_id, user_id, pattern, category_id, supplier_id, active, created_at";

const AGREEMENT_COLUMNS: &str = "agreement_id, user_id, name, category_id, supplier_id, owner,
        start_month, end_month, cost_per_month, frequency, notes, status, created_at";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff when another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> AnyResult<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Open a private in-memory database with the schema applied
    pub fn in_memory() -> AnyResult<Self> {
        let repo = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        repo.ensure_schema()?;
        Ok(repo)
    }

    fn try_open_connection(db_path: &Path) -> AnyResult<Connection> {
        // Extension autoloading stays off; JSON is compiled in
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> AnyResult<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> AnyResult<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

// === Row mapping ===

fn uuid_column(idx: usize, value: &str) -> duckdb::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_entry(row: &Row) -> duckdb::Result<LedgerEntry> {
    let entry_type: String = row.get(5)?;
    let agreement_id: Option<String> = row.get(10)?;
    let created_at: String = row.get(12)?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        display_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        amount: f64_to_decimal(row.get(4)?),
        entry_type: EntryType::parse(&entry_type),
        currency: row.get(6)?,
        month: row.get(7)?,
        category_id: row.get(8)?,
        supplier_id: row.get(9)?,
        agreement_id: agreement_id.map(|s| uuid_column(10, &s)).transpose()?,
        notes: row.get(11)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_rule(row: &Row) -> duckdb::Result<ImportRule> {
    let created_at: String = row.get(6)?;
    Ok(ImportRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        pattern: row.get(2)?,
        category_id: row.get(3)?,
        supplier_id: row.get(4)?,
        active: row.get(5)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_agreement(row: &Row) -> duckdb::Result<Agreement> {
    let id: String = row.get(0)?;
    let frequency: String = row.get(9)?;
    let status: String = row.get(11)?;
    let created_at: String = row.get(12)?;

    Ok(Agreement {
        id: uuid_column(0, &id)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        supplier_id: row.get(4)?,
        owner: row.get(5)?,
        start_month: row.get(6)?,
        end_month: row.get(7)?,
        cost_per_month: f64_to_decimal(row.get(8)?),
        frequency: frequency.parse::<Frequency>().unwrap_or_default(),
        notes: row.get(10)?,
        status: status.parse::<AgreementStatus>().unwrap_or_default(),
        created_at: parse_timestamp(&created_at),
    })
}

// === Statement helpers shared by transactional and plain paths ===

fn insert_entries_with(conn: &Connection, drafts: &[LedgerEntryDraft]) -> Result<Vec<LedgerEntry>> {
    let created_at = Utc::now();
    let mut inserted = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let id: i64 = conn.query_row("SELECT nextval('seq_entry_id')", [], |row| row.get(0))?;
        let display_id = format_display_id(id as u32);

        conn.execute(
            "INSERT INTO sys_ledger_entries (entry_id, display_id, user_id, name, amount,
                                             entry_type, currency, month, category_id,
                                             supplier_id, agreement_id, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                display_id,
                draft.user_id,
                draft.name,
                decimal_to_f64(draft.amount),
                draft.entry_type.as_str(),
                draft.currency,
                draft.month,
                draft.category_id,
                draft.supplier_id,
                draft.agreement_id.map(|id| id.to_string()),
                draft.notes,
                created_at.to_rfc3339(),
            ],
        )?;

        inserted.push(LedgerEntry {
            id,
            display_id,
            user_id: draft.user_id,
            name: draft.name.clone(),
            amount: draft.amount,
            entry_type: draft.entry_type,
            currency: draft.currency.clone(),
            month: draft.month.clone(),
            category_id: draft.category_id,
            supplier_id: draft.supplier_id,
            agreement_id: draft.agreement_id,
            notes: draft.notes.clone(),
            created_at,
        });
    }

    Ok(inserted)
}

fn insert_agreement(conn: &Connection, agreement: &Agreement) -> Result<()> {
    conn.execute(
        "INSERT INTO sys_agreements (agreement_id, user_id, name, category_id, supplier_id, owner,
                                     start_month, end_month, cost_per_month, frequency, notes,
                                     status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            agreement.id.to_string(),
            agreement.user_id,
            agreement.name,
            agreement.category_id,
            agreement.supplier_id,
            agreement.owner,
            agreement.start_month,
            agreement.end_month,
            decimal_to_f64(agreement.cost_per_month),
            agreement.frequency.label(),
            agreement.notes,
            agreement.status.label(),
            agreement.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn update_agreement_row(conn: &Connection, agreement: &Agreement) -> Result<()> {
    let changed = conn.execute(
        "UPDATE sys_agreements
         SET name = ?, category_id = ?, supplier_id = ?, owner = ?, start_month = ?,
             end_month = ?, cost_per_month = ?, frequency = ?, notes = ?, status = ?
         WHERE agreement_id = ? AND user_id = ?",
        params![
            agreement.name,
            agreement.category_id,
            agreement.supplier_id,
            agreement.owner,
            agreement.start_month,
            agreement.end_month,
            decimal_to_f64(agreement.cost_per_month),
            agreement.frequency.label(),
            agreement.notes,
            agreement.status.label(),
            agreement.id.to_string(),
            agreement.user_id,
        ],
    )?;

    if changed == 0 {
        return Err(Error::not_found(format!("Agreement {}", agreement.id)));
    }
    Ok(())
}

fn delete_entries_for(conn: &Connection, agreement_id: Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM sys_ledger_entries WHERE agreement_id = ?",
        params![agreement_id.to_string()],
    )?)
}

// === Ledger ===

impl LedgerRepository for DuckDbRepository {
    fn get_entries_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_ledger_entries WHERE user_id = ? ORDER BY month, entry_id",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map([user_id], row_to_entry)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn insert_entries(&self, drafts: &[LedgerEntryDraft]) -> Result<Vec<LedgerEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = insert_entries_with(&tx, drafts)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn get_entries_by_agreement(&self, agreement_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_ledger_entries WHERE agreement_id = ? ORDER BY month, entry_id",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map([agreement_id.to_string()], row_to_entry)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }
}

// === Rules ===

impl RuleRepository for DuckDbRepository {
    fn get_active_rules(&self, user_id: i64, order: RuleOrder) -> Result<Vec<ImportRule>> {
        let direction = match order {
            RuleOrder::OldestFirst => "ASC",
            RuleOrder::NewestFirst => "DESC",
        };
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_import_rules
             WHERE user_id = ? AND active = TRUE
             ORDER BY rule_id {}",
            RULE_COLUMNS, direction
        ))?;
        let rows = stmt.query_map([user_id], row_to_rule)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn get_rules(&self, user_id: i64) -> Result<Vec<ImportRule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_import_rules WHERE user_id = ? ORDER BY rule_id",
            RULE_COLUMNS
        ))?;
        let rows = stmt.query_map([user_id], row_to_rule)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn get_rule(&self, id: i64, user_id: i64) -> Result<Option<ImportRule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_import_rules WHERE rule_id = ? AND user_id = ?",
            RULE_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id, user_id], row_to_rule)?;
        Ok(rows.next().transpose()?)
    }

    fn insert_rule(&self, rule: &NewImportRule) -> Result<ImportRule> {
        let conn = self.lock()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_rule_id')", [], |row| row.get(0))?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO sys_import_rules (rule_id, user_id, pattern, category_id, supplier_id, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                rule.user_id,
                rule.pattern,
                rule.category_id,
                rule.supplier_id,
                rule.active,
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(ImportRule {
            id,
            user_id: rule.user_id,
            pattern: rule.pattern.clone(),
            category_id: rule.category_id,
            supplier_id: rule.supplier_id,
            active: rule.active,
            created_at,
        })
    }

    fn update_rule(&self, rule: &ImportRule) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sys_import_rules
             SET pattern = ?, category_id = ?, supplier_id = ?, active = ?
             WHERE rule_id = ? AND user_id = ?",
            params![
                rule.pattern,
                rule.category_id,
                rule.supplier_id,
                rule.active,
                rule.id,
                rule.user_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("Rule {}", rule.id)));
        }
        Ok(())
    }

    fn delete_rule(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sys_import_rules WHERE rule_id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

// === Categories and suppliers ===

impl CatalogRepository for DuckDbRepository {
    fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT category_id, name FROM sys_categories WHERE category_id = ?")?;
        let mut rows = stmt.query_map([id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    fn get_supplier(&self, id: i64) -> Result<Option<Supplier>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT supplier_id, name, category_id FROM sys_suppliers WHERE supplier_id = ?",
        )?;
        let mut rows = stmt.query_map([id], |row| {
            Ok(Supplier {
                id: row.get(0)?,
                name: row.get(1)?,
                category_id: row.get(2)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    fn add_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Category name must not be empty"));
        }

        let conn = self.lock()?;
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_categories WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::validation(format!("Category '{}' already exists", name)));
        }

        let id: i64 = conn.query_row("SELECT nextval('seq_category_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO sys_categories (category_id, name, created_at) VALUES (?, ?, ?)",
            params![id, name, Utc::now().to_rfc3339()],
        )?;

        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    fn add_supplier(&self, name: &str, category_id: i64) -> Result<Supplier> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Supplier name must not be empty"));
        }

        let conn = self.lock()?;
        let category_exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_categories WHERE category_id = ?",
            [category_id],
            |row| row.get(0),
        )?;
        if category_exists == 0 {
            return Err(Error::not_found(format!("Category {}", category_id)));
        }

        let id: i64 = conn.query_row("SELECT nextval('seq_supplier_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO sys_suppliers (supplier_id, name, category_id, created_at) VALUES (?, ?, ?, ?)",
            params![id, name, category_id, Utc::now().to_rfc3339()],
        )?;

        Ok(Supplier {
            id,
            name: name.to_string(),
            category_id,
        })
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT category_id, name FROM sys_categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT supplier_id, name, category_id FROM sys_suppliers ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Supplier {
                id: row.get(0)?,
                name: row.get(1)?,
                category_id: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }
}

// === Agreements ===

impl AgreementRepository for DuckDbRepository {
    fn create_agreement(
        &self,
        agreement: &Agreement,
        entries: &[LedgerEntryDraft],
    ) -> Result<Vec<LedgerEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_agreement(&tx, agreement)?;
        let inserted = insert_entries_with(&tx, entries)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn get_agreement(&self, id: Uuid, user_id: i64) -> Result<Option<Agreement>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_agreements WHERE agreement_id = ? AND user_id = ?",
            AGREEMENT_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id.to_string(), user_id], row_to_agreement)?;
        Ok(rows.next().transpose()?)
    }

    fn list_agreements(&self, user_id: i64) -> Result<Vec<Agreement>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_agreements WHERE user_id = ? ORDER BY start_month, name",
            AGREEMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([user_id], row_to_agreement)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn update_agreement(&self, agreement: &Agreement) -> Result<()> {
        let conn = self.lock()?;
        update_agreement_row(&conn, agreement)
    }

    fn replace_agreement_entries(
        &self,
        agreement: &Agreement,
        entries: &[LedgerEntryDraft],
    ) -> Result<Vec<LedgerEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        update_agreement_row(&tx, agreement)?;
        delete_entries_for(&tx, agreement.id)?;
        let inserted = insert_entries_with(&tx, entries)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn delete_agreement(&self, id: Uuid) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = delete_entries_for(&tx, id)?;
        tx.execute(
            "DELETE FROM sys_agreements WHERE agreement_id = ?",
            params![id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}

// Helper functions

fn decimal_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

fn f64_to_decimal(amount: f64) -> Decimal {
    Decimal::try_from(amount).unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
