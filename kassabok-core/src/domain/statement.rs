//! Bank statement rows and the transactions parsed from them

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cell as read from a statement file
///
/// Interpretation (dates, amounts) is left to the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Whether the cell carries any content
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Number(n) => !n.is_nan(),
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Empty => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a trailing ".0"
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

/// One data row, keyed by the header text found in the file
pub type RowRecord = BTreeMap<String, CellValue>;

/// A statement row normalized into the engine's canonical shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    /// Booking date, `YYYY-MM-DD`
    pub date: String,
    /// Trimmed description text
    pub description: String,
    /// Signed amount, negative for debits
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_supplier_id: Option<i64>,
    pub is_duplicate: bool,
    /// The raw row this transaction came from
    pub original_row: RowRecord,
}

impl CanonicalTransaction {
    /// Create an unannotated transaction
    pub fn new(
        date: String,
        description: String,
        amount: Decimal,
        reference: Option<String>,
        original_row: RowRecord,
    ) -> Self {
        Self {
            date,
            description,
            amount,
            reference,
            suggested_category_id: None,
            suggested_supplier_id: None,
            is_duplicate: false,
            original_row,
        }
    }

    /// Whether the rule engine attached any suggestion
    pub fn has_suggestion(&self) -> bool {
        self.suggested_category_id.is_some() || self.suggested_supplier_id.is_some()
    }
}

/// Counters reported alongside an import preview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Successfully normalized transactions
    pub total: usize,
    /// Transactions flagged as probable re-imports
    pub duplicates: usize,
    /// Transactions a rule matched
    pub matched: usize,
}

/// Advisory result of parsing a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub transactions: Vec<CanonicalTransaction>,
    pub summary: ImportSummary,
}

/// A previewed transaction the user chose to keep
///
/// Explicit ids override the transaction's suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSelection {
    pub transaction: CanonicalTransaction,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub supplier_id: Option<i64>,
}

impl ImportSelection {
    /// Keep a transaction with whatever the rule engine suggested
    pub fn accept(transaction: CanonicalTransaction) -> Self {
        Self {
            transaction,
            category_id: None,
            supplier_id: None,
        }
    }

    /// Category and supplier that will be written for this selection
    pub fn resolved_ids(&self) -> (Option<i64>, Option<i64>) {
        if self.category_id.is_none() && self.supplier_id.is_none() {
            (
                self.transaction.suggested_category_id,
                self.transaction.suggested_supplier_id,
            )
        } else {
            (self.category_id, self.supplier_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(45667.0).to_string(), "45667");
        assert_eq!(CellValue::Number(-12.5).to_string(), "-12.5");
        assert_eq!(CellValue::Text("Beskrivning".into()).to_string(), "Beskrivning");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_cell_presence() {
        assert!(CellValue::Number(0.0).is_present());
        assert!(CellValue::Text(" ".into()).is_present());
        assert!(!CellValue::Text(String::new()).is_present());
        assert!(!CellValue::Empty.is_present());
    }

    #[test]
    fn test_selection_overrides_suggestions() {
        let mut tx = CanonicalTransaction::new(
            "2025-03-15".into(),
            "ICA".into(),
            Decimal::new(-12000, 2),
            None,
            RowRecord::new(),
        );
        tx.suggested_category_id = Some(1);
        tx.suggested_supplier_id = Some(2);

        let accepted = ImportSelection::accept(tx.clone());
        assert_eq!(accepted.resolved_ids(), (Some(1), Some(2)));

        let overridden = ImportSelection {
            transaction: tx,
            category_id: Some(9),
            supplier_id: None,
        };
        assert_eq!(overridden.resolved_ids(), (Some(9), None));
    }
}
