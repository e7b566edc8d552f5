//! Import service - statement preview and confirmation
//!
//! `parse_statement` never writes storage. It reads the user's ledger and
//! active rules once, then annotates every normalized transaction with a
//! duplicate flag and a rule suggestion. `confirm_import` persists the
//! subset the caller kept.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::month::month_of_date;
use crate::domain::result::{Error, Result};
use crate::domain::{
    EntryType, ImportPreview, ImportSelection, ImportSummary, LedgerEntry, LedgerEntryDraft,
    RuleOrder,
};
use crate::ports::{CatalogRepository, LedgerRepository, RuleRepository};

use super::duplicate::flag_duplicates;
use super::extract::TabularExtractor;
use super::normalize::normalize_all;
use super::rules::{match_rule, resolve_suggestion};

/// Import service for bank statements
pub struct ImportService {
    ledger: Arc<dyn LedgerRepository>,
    rules: Arc<dyn RuleRepository>,
    catalog: Arc<dyn CatalogRepository>,
    extractor: TabularExtractor,
    rule_order: RuleOrder,
}

impl ImportService {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        rules: Arc<dyn RuleRepository>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            ledger,
            rules,
            catalog,
            extractor: TabularExtractor::default(),
            rule_order: RuleOrder::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: TabularExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_rule_order(mut self, rule_order: RuleOrder) -> Self {
        self.rule_order = rule_order;
        self
    }

    /// Parse a statement into an advisory preview
    ///
    /// Unsupported formats and extraction failures abort the whole call.
    /// Rows that cannot be normalized are dropped and not counted.
    pub fn parse_statement(&self, buffer: &[u8], filename: &str, user_id: i64) -> Result<ImportPreview> {
        let rows = self.extractor.extract(buffer, filename)?;
        let mut transactions = normalize_all(&rows);

        let entries = self.ledger.get_entries_for_user(user_id)?;
        let rules = self.rules.get_active_rules(user_id, self.rule_order)?;

        let mut summary = ImportSummary {
            total: transactions.len(),
            duplicates: flag_duplicates(&mut transactions, &entries),
            ..Default::default()
        };

        for tx in transactions.iter_mut() {
            if let Some(rule) = match_rule(&tx.description, &rules) {
                let suggestion = resolve_suggestion(rule, self.catalog.as_ref())?;
                tx.suggested_category_id = suggestion.category_id;
                tx.suggested_supplier_id = suggestion.supplier_id;
                summary.matched += 1;
            }
        }

        tracing::info!(
            rows = rows.len(),
            total = summary.total,
            duplicates = summary.duplicates,
            matched = summary.matched,
            "parsed statement"
        );

        Ok(ImportPreview {
            transactions,
            summary,
        })
    }

    /// Persist the selected transactions as one batch
    ///
    /// Duplicates are skipped. A selection left without category and
    /// supplier fails the whole call before anything is written.
    pub fn confirm_import(&self, user_id: i64, selections: Vec<ImportSelection>) -> Result<Vec<LedgerEntry>> {
        let mut drafts = Vec::with_capacity(selections.len());
        let mut skipped = 0;

        for selection in selections {
            if selection.transaction.is_duplicate {
                skipped += 1;
                continue;
            }

            let (category_id, supplier_id) = selection.resolved_ids();
            if category_id.is_none() && supplier_id.is_none() {
                return Err(Error::validation(format!(
                    "Transaction on {} has neither category nor supplier",
                    selection.transaction.date
                )));
            }

            let tx = selection.transaction;
            let month = month_of_date(&tx.date).to_string();
            let entry_type = EntryType::from_amount(tx.amount);

            let mut draft = LedgerEntryDraft::new(user_id, tx.description, tx.amount, entry_type, month);
            draft.category_id = category_id;
            draft.supplier_id = supplier_id;
            draft.notes = tx.reference;
            drafts.push(draft);
        }

        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.ledger.insert_entries(&drafts)?;
        tracing::info!(inserted = entries.len(), skipped, "confirmed import");
        Ok(entries)
    }
}

/// Sum of the amounts that `confirm_import` would write
pub fn selection_total(selections: &[ImportSelection]) -> Decimal {
    selections
        .iter()
        .filter(|s| !s.transaction.is_duplicate)
        .map(|s| s.transaction.amount)
        .sum()
}
