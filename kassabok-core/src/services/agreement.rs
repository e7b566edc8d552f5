//! Agreement service - recurring obligations and their ledger schedule
//!
//! Creating an agreement expands it into one expense entry per billing
//! month between its start and end month, written together with the
//! agreement in a single transaction. What an update does to entries
//! that already exist is decided by [`AgreementUpdatePolicy`].

use std::sync::Arc;

use uuid::Uuid;

use crate::config::AgreementUpdatePolicy;
use crate::domain::month::checked_next_month;
use crate::domain::result::{Error, Result};
use crate::domain::{Agreement, AgreementDraft, EntryType, Frequency, LedgerEntry, LedgerEntryDraft};
use crate::ports::{AgreementRepository, LedgerRepository};

/// Billing months from `start` to `end` inclusive
///
/// Iteration stops once the next month sorts after `end` or would
/// leave year 9999. Both bounds must be zero-padded `YYYY-MM` strings.
pub fn schedule_months(start: &str, end: &str, frequency: Frequency) -> Result<Vec<String>> {
    let step = frequency.step_months();
    let mut months = Vec::new();
    let mut current = start.to_string();

    while current.as_str() <= end {
        let next = checked_next_month(&current, step)?;
        months.push(current);
        match next {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(months)
}

/// Ledger drafts for every billing month of an agreement
pub fn expand(agreement: &Agreement) -> Result<Vec<LedgerEntryDraft>> {
    let months = schedule_months(
        &agreement.start_month,
        agreement.effective_end_month(),
        agreement.frequency,
    )?;

    Ok(months
        .into_iter()
        .map(|month| {
            let mut draft = LedgerEntryDraft::new(
                agreement.user_id,
                agreement.name.clone(),
                agreement.cost_per_month,
                EntryType::Expense,
                month,
            );
            draft.category_id = Some(agreement.category_id);
            draft.supplier_id = Some(agreement.supplier_id);
            draft.agreement_id = Some(agreement.id);
            draft.notes = agreement.notes.clone();
            draft
        })
        .collect())
}

/// Agreement created together with its generated entries
#[derive(Debug, Clone)]
pub struct CreatedAgreement {
    pub agreement: Agreement,
    pub entries: Vec<LedgerEntry>,
}

/// Agreement service
pub struct AgreementService {
    agreements: Arc<dyn AgreementRepository>,
    ledger: Arc<dyn LedgerRepository>,
    policy: AgreementUpdatePolicy,
}

impl AgreementService {
    pub fn new(
        agreements: Arc<dyn AgreementRepository>,
        ledger: Arc<dyn LedgerRepository>,
        policy: AgreementUpdatePolicy,
    ) -> Self {
        Self {
            agreements,
            ledger,
            policy,
        }
    }

    pub fn policy(&self) -> AgreementUpdatePolicy {
        self.policy
    }

    /// Validate, expand and persist a new agreement
    ///
    /// Either the agreement and all of its entries are stored, or nothing is.
    pub fn create_agreement(&self, draft: AgreementDraft) -> Result<CreatedAgreement> {
        draft.validate()?;
        let agreement = Agreement::from_draft(draft);
        let drafts = expand(&agreement)?;

        let entries = self.agreements.create_agreement(&agreement, &drafts)?;
        tracing::info!(
            agreement_id = %agreement.id,
            entries = entries.len(),
            frequency = agreement.frequency.label(),
            "created agreement"
        );

        Ok(CreatedAgreement { agreement, entries })
    }

    pub fn get_agreement(&self, id: Uuid, user_id: i64) -> Result<Agreement> {
        self.agreements
            .get_agreement(id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Agreement {}", id)))
    }

    /// A user's agreements ordered by start month, then name
    pub fn list_agreements(&self, user_id: i64) -> Result<Vec<Agreement>> {
        self.agreements.list_agreements(user_id)
    }

    /// Entries generated by an agreement, ordered by month
    pub fn agreement_entries(&self, id: Uuid, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let agreement = self.get_agreement(id, user_id)?;
        self.ledger.get_entries_by_agreement(agreement.id)
    }

    /// Replace the editable fields of an agreement
    ///
    /// Under `Snapshot` existing entries are left as generated. Under
    /// `Regenerate` they are replaced by a fresh expansion in the same
    /// transaction as the update.
    pub fn update_agreement(&self, id: Uuid, user_id: i64, draft: AgreementDraft) -> Result<Agreement> {
        draft.validate()?;
        let existing = self.get_agreement(id, user_id)?;
        if draft.user_id != existing.user_id {
            return Err(Error::validation("Agreement owner cannot be changed"));
        }

        let updated = Agreement::with_id(existing.id, existing.created_at, draft);

        match self.policy {
            AgreementUpdatePolicy::Snapshot => {
                self.agreements.update_agreement(&updated)?;
                tracing::info!(agreement_id = %updated.id, "updated agreement, entries kept");
            }
            AgreementUpdatePolicy::Regenerate => {
                let drafts = expand(&updated)?;
                let entries = self.agreements.replace_agreement_entries(&updated, &drafts)?;
                tracing::info!(
                    agreement_id = %updated.id,
                    entries = entries.len(),
                    "updated agreement, entries regenerated"
                );
            }
        }

        Ok(updated)
    }

    /// Delete an agreement and every entry it generated
    ///
    /// Returns the number of entries removed.
    pub fn delete_agreement(&self, id: Uuid, user_id: i64) -> Result<usize> {
        let agreement = self.get_agreement(id, user_id)?;
        let removed = self.agreements.delete_agreement(agreement.id)?;
        tracing::info!(agreement_id = %agreement.id, removed, "deleted agreement");
        Ok(removed)
    }
}
