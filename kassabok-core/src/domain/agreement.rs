//! Recurring agreement domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::month::validate_month;
use super::result::{Error, Result};

/// Billing cadence of an agreement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "Månadsvis")]
    Monthly,
    #[serde(rename = "Kvartalsvis")]
    Quarterly,
    #[serde(rename = "Halvårsvis")]
    SemiAnnual,
    #[serde(rename = "Årligen")]
    Annual,
}

impl Frequency {
    /// Number of months between two billings
    pub fn step_months(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::SemiAnnual => 6,
            Frequency::Annual => 12,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Monthly => "Månadsvis",
            Frequency::Quarterly => "Kvartalsvis",
            Frequency::SemiAnnual => "Halvårsvis",
            Frequency::Annual => "Årligen",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "månadsvis" | "monthly" => Ok(Frequency::Monthly),
            "kvartalsvis" | "quarterly" => Ok(Frequency::Quarterly),
            "halvårsvis" | "semiannual" | "semi-annual" => Ok(Frequency::SemiAnnual),
            "årligen" | "annual" | "yearly" => Ok(Frequency::Annual),
            other => Err(Error::validation(format!("Unknown frequency '{}'", other))),
        }
    }
}

/// Lifecycle tag of an agreement (informational only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementStatus {
    #[default]
    #[serde(rename = "aktiv")]
    Active,
    #[serde(rename = "avslutad")]
    Ended,
    #[serde(rename = "undertecknad")]
    Signed,
    #[serde(rename = "väntar på motpart")]
    AwaitingCounterparty,
}

impl AgreementStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgreementStatus::Active => "aktiv",
            AgreementStatus::Ended => "avslutad",
            AgreementStatus::Signed => "undertecknad",
            AgreementStatus::AwaitingCounterparty => "väntar på motpart",
        }
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgreementStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "aktiv" | "active" => Ok(AgreementStatus::Active),
            "avslutad" | "ended" => Ok(AgreementStatus::Ended),
            "undertecknad" | "signed" => Ok(AgreementStatus::Signed),
            "väntar på motpart" | "awaiting" => Ok(AgreementStatus::AwaitingCounterparty),
            other => Err(Error::validation(format!("Unknown agreement status '{}'", other))),
        }
    }
}

/// Editable fields of an agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementDraft {
    pub user_id: i64,
    pub name: String,
    pub category_id: i64,
    pub supplier_id: i64,
    #[serde(default)]
    pub owner: Option<String>,
    /// First billing month, `YYYY-MM`
    pub start_month: String,
    /// Last billing month, defaults to `start_month`
    #[serde(default)]
    pub end_month: Option<String>,
    pub cost_per_month: Decimal,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: AgreementStatus,
}

impl AgreementDraft {
    /// Check the fields schedule expansion depends on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Agreement name must not be empty"));
        }

        validate_month("startMonth", &self.start_month)?;
        if let Some(end) = &self.end_month {
            validate_month("endMonth", end)?;
            if end.as_str() < self.start_month.as_str() {
                return Err(Error::validation(format!(
                    "endMonth {} is before startMonth {}",
                    end, self.start_month
                )));
            }
        }

        Ok(())
    }
}

/// A persisted recurring obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    pub category_id: i64,
    pub supplier_id: i64,
    pub owner: Option<String>,
    pub start_month: String,
    pub end_month: Option<String>,
    pub cost_per_month: Decimal,
    pub frequency: Frequency,
    pub notes: Option<String>,
    pub status: AgreementStatus,
    pub created_at: DateTime<Utc>,
}

impl Agreement {
    /// Create a new agreement from a draft with a fresh id
    pub fn from_draft(draft: AgreementDraft) -> Self {
        Self::with_id(Uuid::new_v4(), Utc::now(), draft)
    }

    /// Build an agreement from a draft, keeping identity fields
    pub fn with_id(id: Uuid, created_at: DateTime<Utc>, draft: AgreementDraft) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            name: draft.name.trim().to_string(),
            category_id: draft.category_id,
            supplier_id: draft.supplier_id,
            owner: draft.owner,
            start_month: draft.start_month,
            end_month: draft.end_month,
            cost_per_month: draft.cost_per_month,
            frequency: draft.frequency,
            notes: draft.notes,
            status: draft.status,
            created_at,
        }
    }

    /// Last billing month, falling back to the start month
    pub fn effective_end_month(&self) -> &str {
        self.end_month.as_deref().unwrap_or(&self.start_month)
    }
}
