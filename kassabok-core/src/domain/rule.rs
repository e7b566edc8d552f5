//! Import rule domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pattern rule that suggests a category and/or supplier for imported rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRule {
    /// Unique rule ID, ascending in creation order
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Case-insensitive substring matched against the description
    pub pattern: String,
    /// Category to suggest
    pub category_id: Option<i64>,
    /// Supplier to suggest
    pub supplier_id: Option<i64>,
    /// Inactive rules never match
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ImportRule {
    /// Whether this rule matches a description
    pub fn matches(&self, description: &str) -> bool {
        description
            .to_lowercase()
            .contains(&self.pattern.to_lowercase())
    }
}

/// Fields for creating a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImportRule {
    pub user_id: i64,
    pub pattern: String,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update of a rule
///
/// `Some(None)` on an id field clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub pattern: Option<String>,
    pub category_id: Option<Option<i64>>,
    pub supplier_id: Option<Option<i64>>,
    pub active: Option<bool>,
}

impl RuleUpdate {
    /// Apply the patch to a rule in place
    pub fn apply(self, rule: &mut ImportRule) {
        if let Some(pattern) = self.pattern {
            rule.pattern = pattern;
        }
        if let Some(category_id) = self.category_id {
            rule.category_id = category_id;
        }
        if let Some(supplier_id) = self.supplier_id {
            rule.supplier_id = supplier_id;
        }
        if let Some(active) = self.active {
            rule.active = active;
        }
    }
}

/// Order in which active rules are tested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOrder {
    /// Ascending rule id, i.e. creation order
    #[default]
    OldestFirst,
    /// Descending rule id
    NewestFirst,
}
