//! Duplicate detection against the user's ledger
//!
//! A statement transaction is a probable re-import when some ledger entry
//! has the same month and an amount within one öre. Distinct purchases of
//! the same amount in one month collide; that is accepted.

use rust_decimal::Decimal;

use crate::domain::month::month_of_date;
use crate::domain::{CanonicalTransaction, LedgerEntry};

/// Largest amount difference (exclusive) still treated as the same entry
pub const DUPLICATE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Whether any entry shares the transaction's month and amount
pub fn is_duplicate(transaction: &CanonicalTransaction, entries: &[LedgerEntry]) -> bool {
    let month = month_of_date(&transaction.date);
    entries.iter().any(|entry| {
        entry.month == month && (entry.amount - transaction.amount).abs() < DUPLICATE_TOLERANCE
    })
}

/// Set `is_duplicate` on every transaction and return how many were flagged
pub fn flag_duplicates(transactions: &mut [CanonicalTransaction], entries: &[LedgerEntry]) -> usize {
    let mut flagged = 0;
    for tx in transactions.iter_mut() {
        tx.is_duplicate = is_duplicate(tx, entries);
        if tx.is_duplicate {
            flagged += 1;
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use chrono::Utc;

    use crate::domain::{EntryType, RowRecord, DEFAULT_CURRENCY};

    fn tx(date: &str, amount: &str) -> CanonicalTransaction {
        CanonicalTransaction::new(
            date.to_string(),
            "ICA".to_string(),
            Decimal::from_str(amount).unwrap(),
            None,
            RowRecord::new(),
        )
    }

    fn entry(month: &str, amount: &str) -> LedgerEntry {
        LedgerEntry {
            id: 1,
            display_id: "A000001".to_string(),
            user_id: 1,
            name: "ICA".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            entry_type: EntryType::Expense,
            currency: DEFAULT_CURRENCY.to_string(),
            month: month.to_string(),
            category_id: None,
            supplier_id: None,
            agreement_id: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tolerance_is_one_hundredth() {
        assert_eq!(DUPLICATE_TOLERANCE, Decimal::new(1, 2));
    }

    #[test]
    fn test_same_month_same_amount() {
        let t = tx("2025-03-15", "-120.00");
        assert!(is_duplicate(&t, &[entry("2025-03", "-120.00")]));
    }

    #[test]
    fn test_within_tolerance() {
        let t = tx("2025-03-15", "-120.00");
        assert!(is_duplicate(&t, &[entry("2025-03", "-120.005")]));
    }

    #[test]
    fn test_outside_tolerance() {
        let t = tx("2025-03-15", "-120.00");
        assert!(!is_duplicate(&t, &[entry("2025-03", "-120.02")]));
        assert!(!is_duplicate(&t, &[entry("2025-03", "-120.01")]));
    }

    #[test]
    fn test_other_month() {
        let t = tx("2025-03-15", "-120.00");
        assert!(!is_duplicate(&t, &[entry("2025-02", "-120.00")]));
    }

    #[test]
    fn test_sign_matters() {
        let t = tx("2025-03-15", "-120.00");
        assert!(!is_duplicate(&t, &[entry("2025-03", "120.00")]));
    }

    #[test]
    fn test_empty_ledger() {
        let t = tx("2025-03-15", "-120.00");
        assert!(!is_duplicate(&t, &[]));
    }

    #[test]
    fn test_flag_duplicates_counts() {
        let mut txs = vec![
            tx("2025-03-15", "-120.00"),
            tx("2025-03-20", "-55.00"),
            tx("2025-04-01", "-120.00"),
        ];
        let flagged = flag_duplicates(&mut txs, &[entry("2025-03", "-120.00")]);

        assert_eq!(flagged, 1);
        assert!(txs[0].is_duplicate);
        assert!(!txs[1].is_duplicate);
        assert!(!txs[2].is_duplicate);
    }
}
