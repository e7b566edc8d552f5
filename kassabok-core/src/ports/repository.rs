//! Repository ports - storage abstraction for the engine
//!
//! The engine never talks to a database directly. Every read it needs
//! goes through one of these traits; the DuckDB adapter implements all
//! of them. Ledger, rule and agreement reads are always user-scoped.

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{
    Agreement, Category, ImportRule, LedgerEntry, LedgerEntryDraft, NewImportRule, RuleOrder,
    Supplier,
};

/// Persisted income/expense lines
pub trait LedgerRepository: Send + Sync {
    /// All entries owned by a user, ordered by month then id
    fn get_entries_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>>;

    /// Insert a batch of entries as one transaction
    ///
    /// Either every draft is persisted or none is.
    fn insert_entries(&self, drafts: &[LedgerEntryDraft]) -> Result<Vec<LedgerEntry>>;

    /// Entries generated by an agreement, ordered by month
    fn get_entries_by_agreement(&self, agreement_id: Uuid) -> Result<Vec<LedgerEntry>>;
}

/// Import rules consulted by the rule engine
pub trait RuleRepository: Send + Sync {
    /// Active rules for a user in the given deterministic order
    fn get_active_rules(&self, user_id: i64, order: RuleOrder) -> Result<Vec<ImportRule>>;

    /// Every rule for a user (active or not), oldest first
    fn get_rules(&self, user_id: i64) -> Result<Vec<ImportRule>>;

    fn get_rule(&self, id: i64, user_id: i64) -> Result<Option<ImportRule>>;

    fn insert_rule(&self, rule: &NewImportRule) -> Result<ImportRule>;

    fn update_rule(&self, rule: &ImportRule) -> Result<()>;

    /// Returns false when no rule was deleted
    fn delete_rule(&self, id: i64, user_id: i64) -> Result<bool>;
}

/// Categories and suppliers (lookup for supplier -> category inference)
pub trait CatalogRepository: Send + Sync {
    fn get_category(&self, id: i64) -> Result<Option<Category>>;

    fn get_supplier(&self, id: i64) -> Result<Option<Supplier>>;

    fn add_category(&self, name: &str) -> Result<Category>;

    fn add_supplier(&self, name: &str, category_id: i64) -> Result<Supplier>;

    fn list_categories(&self) -> Result<Vec<Category>>;

    fn list_suppliers(&self) -> Result<Vec<Supplier>>;
}

/// Recurring agreements and the entries they own
pub trait AgreementRepository: Send + Sync {
    /// Persist an agreement and its generated entries in one transaction
    fn create_agreement(
        &self,
        agreement: &Agreement,
        entries: &[LedgerEntryDraft],
    ) -> Result<Vec<LedgerEntry>>;

    fn get_agreement(&self, id: Uuid, user_id: i64) -> Result<Option<Agreement>>;

    /// A user's agreements, ordered by start month then name
    fn list_agreements(&self, user_id: i64) -> Result<Vec<Agreement>>;

    /// Rewrite the agreement row only
    fn update_agreement(&self, agreement: &Agreement) -> Result<()>;

    /// Rewrite the agreement and swap its generated entries in one transaction
    fn replace_agreement_entries(
        &self,
        agreement: &Agreement,
        entries: &[LedgerEntryDraft],
    ) -> Result<Vec<LedgerEntry>>;

    /// Delete an agreement and every entry it generated, in one transaction
    ///
    /// Returns the number of entries removed.
    fn delete_agreement(&self, id: Uuid) -> Result<usize>;
}
