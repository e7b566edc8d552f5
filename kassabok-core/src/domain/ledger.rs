//! Ledger entry domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default currency for new entries
pub const DEFAULT_CURRENCY: &str = "SEK";

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
        }
    }

    /// Parse the stored representation, defaulting to expense
    pub fn parse(s: &str) -> Self {
        match s {
            "income" => EntryType::Income,
            _ => EntryType::Expense,
        }
    }

    /// Statement sign convention: debits are negative
    pub fn from_amount(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            EntryType::Expense
        } else {
            EntryType::Income
        }
    }
}

/// A persisted income or expense line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    /// Human-facing identifier, e.g. `A000042`
    pub display_id: String,
    pub user_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub currency: String,
    /// Billing month, `YYYY-MM`
    pub month: String,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    /// Agreement that generated this entry, if any
    pub agreement_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An entry waiting to be inserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDraft {
    pub user_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub currency: String,
    pub month: String,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub agreement_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl LedgerEntryDraft {
    /// Create a draft in the default currency with no links
    pub fn new(
        user_id: i64,
        name: impl Into<String>,
        amount: Decimal,
        entry_type: EntryType,
        month: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            amount,
            entry_type,
            currency: DEFAULT_CURRENCY.to_string(),
            month: month.into(),
            category_id: None,
            supplier_id: None,
            agreement_id: None,
            notes: None,
        }
    }
}

/// Format a display id from its sequence number
pub fn format_display_id(number: u32) -> String {
    format!("A{:06}", number)
}

/// Extract the sequence number from a display id like `A000123`
pub fn parse_display_number(display_id: &str) -> Option<u32> {
    display_id.strip_prefix('A')?.parse().ok()
}
