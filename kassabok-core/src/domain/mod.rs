//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod agreement;
mod catalog;
mod ledger;
pub mod month;
pub mod result;
mod rule;
mod statement;

pub use agreement::{Agreement, AgreementDraft, AgreementStatus, Frequency};
pub use catalog::{Category, Supplier};
pub use ledger::{
    format_display_id, parse_display_number, EntryType, LedgerEntry, LedgerEntryDraft,
    DEFAULT_CURRENCY,
};
pub use rule::{ImportRule, NewImportRule, RuleOrder, RuleUpdate};
pub use statement::{
    CanonicalTransaction, CellValue, ImportPreview, ImportSelection, ImportSummary, RowRecord,
};
