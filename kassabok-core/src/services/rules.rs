//! Rule engine and rule management
//!
//! Matching is strictly first-match: rules are tested in the order the
//! repository returns them and the first whose pattern occurs in the
//! description (ignoring case) wins, even when a later rule is more
//! specific.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{ImportRule, NewImportRule, RuleUpdate};
use crate::ports::{CatalogRepository, RuleRepository};

/// Category and supplier suggested for a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
}

/// First active rule matching the description
pub fn match_rule<'a>(description: &str, rules: &'a [ImportRule]) -> Option<&'a ImportRule> {
    rules
        .iter()
        .filter(|rule| rule.active)
        .find(|rule| rule.matches(description))
}

/// Turn a matched rule into a suggestion
///
/// A rule with only a supplier borrows the supplier's category. A rule
/// with both ids is used as given.
pub fn resolve_suggestion(rule: &ImportRule, catalog: &dyn CatalogRepository) -> Result<Suggestion> {
    let category_id = match (rule.category_id, rule.supplier_id) {
        (Some(category_id), _) => Some(category_id),
        (None, Some(supplier_id)) => match catalog.get_supplier(supplier_id)? {
            Some(supplier) => Some(supplier.category_id),
            None => {
                tracing::warn!(rule_id = rule.id, supplier_id, "rule points at a missing supplier");
                None
            }
        },
        (None, None) => None,
    };

    Ok(Suggestion {
        category_id,
        supplier_id: rule.supplier_id,
    })
}

/// Create, list, update and delete import rules
pub struct RuleService {
    rules: Arc<dyn RuleRepository>,
}

impl RuleService {
    pub fn new(rules: Arc<dyn RuleRepository>) -> Self {
        Self { rules }
    }

    pub fn create_rule(
        &self,
        user_id: i64,
        pattern: &str,
        category_id: Option<i64>,
        supplier_id: Option<i64>,
    ) -> Result<ImportRule> {
        let pattern = validate_pattern(pattern)?;
        let rule = self.rules.insert_rule(&NewImportRule {
            user_id,
            pattern,
            category_id,
            supplier_id,
            active: true,
        })?;
        tracing::info!(rule_id = rule.id, "created import rule");
        Ok(rule)
    }

    /// Every rule of a user, active or not, oldest first
    pub fn list_rules(&self, user_id: i64) -> Result<Vec<ImportRule>> {
        self.rules.get_rules(user_id)
    }

    pub fn update_rule(&self, id: i64, user_id: i64, update: RuleUpdate) -> Result<ImportRule> {
        let mut rule = self
            .rules
            .get_rule(id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Rule {}", id)))?;

        update.apply(&mut rule);
        rule.pattern = validate_pattern(&rule.pattern)?;

        self.rules.update_rule(&rule)?;
        Ok(rule)
    }

    pub fn delete_rule(&self, id: i64, user_id: i64) -> Result<()> {
        if self.rules.delete_rule(id, user_id)? {
            Ok(())
        } else {
            Err(Error::not_found(format!("Rule {}", id)))
        }
    }
}

fn validate_pattern(pattern: &str) -> Result<String> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Rule pattern must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::adapters::duckdb::DuckDbRepository;

    fn rule(id: i64, pattern: &str, category_id: Option<i64>, supplier_id: Option<i64>) -> ImportRule {
        ImportRule {
            id,
            user_id: 1,
            pattern: pattern.to_string(),
            category_id,
            supplier_id,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_match_wins_over_more_specific() {
        let rules = vec![rule(1, "ICA", Some(10), None), rule(2, "ICA MAXI", Some(20), None)];
        let matched = match_rule("ICA MAXI STORMARKNAD", &rules).unwrap();
        assert_eq!(matched.id, 1);
        assert_eq!(matched.category_id, Some(10));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let rules = vec![rule(1, "spotify", Some(3), None)];
        assert!(match_rule("SPOTIFY AB", &rules).is_some());
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let mut inactive = rule(1, "ICA", Some(10), None);
        inactive.active = false;
        let rules = vec![inactive, rule(2, "ICA MAXI", Some(20), None)];
        assert_eq!(match_rule("ICA MAXI", &rules).unwrap().id, 2);
    }

    #[test]
    fn test_no_rules_no_match() {
        assert!(match_rule("ICA", &[]).is_none());
    }

    #[test]
    fn test_supplier_only_rule_infers_category() {
        let repo = DuckDbRepository::in_memory().unwrap();
        let category = repo.add_category("Mat").unwrap();
        let supplier = repo.add_supplier("ICA", category.id).unwrap();

        let r = rule(1, "ICA", None, Some(supplier.id));
        let suggestion = resolve_suggestion(&r, &repo).unwrap();

        assert_eq!(suggestion.category_id, Some(category.id));
        assert_eq!(suggestion.supplier_id, Some(supplier.id));
    }

    #[test]
    fn test_both_ids_used_as_given() {
        let repo = DuckDbRepository::in_memory().unwrap();
        let food = repo.add_category("Mat").unwrap();
        let other = repo.add_category("Övrigt").unwrap();
        let supplier = repo.add_supplier("ICA", food.id).unwrap();

        let r = rule(1, "ICA", Some(other.id), Some(supplier.id));
        let suggestion = resolve_suggestion(&r, &repo).unwrap();

        assert_eq!(suggestion.category_id, Some(other.id));
        assert_eq!(suggestion.supplier_id, Some(supplier.id));
    }

    #[test]
    fn test_missing_supplier_yields_no_category() {
        let repo = DuckDbRepository::in_memory().unwrap();
        let r = rule(1, "ICA", None, Some(999));
        let suggestion = resolve_suggestion(&r, &repo).unwrap();

        assert_eq!(suggestion.category_id, None);
        assert_eq!(suggestion.supplier_id, Some(999));
    }

    #[test]
    fn test_rule_without_ids_suggests_nothing() {
        let repo = DuckDbRepository::in_memory().unwrap();
        let suggestion = resolve_suggestion(&rule(1, "ICA", None, None), &repo).unwrap();
        assert_eq!(suggestion, Suggestion::default());
    }

    #[test]
    fn test_rule_crud() {
        let repo = Arc::new(DuckDbRepository::in_memory().unwrap());
        let service = RuleService::new(repo);

        let created = service.create_rule(1, "  ICA ", Some(1), None).unwrap();
        assert_eq!(created.pattern, "ICA");
        assert!(created.active);

        let updated = service
            .update_rule(
                created.id,
                1,
                RuleUpdate {
                    active: Some(false),
                    supplier_id: Some(Some(4)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.supplier_id, Some(4));

        let listed = service.list_rules(1).unwrap();
        assert_eq!(listed, vec![updated]);

        service.delete_rule(created.id, 1).unwrap();
        assert!(service.list_rules(1).unwrap().is_empty());
    }

    #[test]
    fn test_rule_crud_errors() {
        let service = RuleService::new(Arc::new(DuckDbRepository::in_memory().unwrap()));

        assert!(matches!(
            service.create_rule(1, "   ", Some(1), None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(service.delete_rule(42, 1), Err(Error::NotFound(_))));

        let created = service.create_rule(1, "ICA", None, None).unwrap();
        // Another user's rule is invisible
        assert!(matches!(
            service.update_rule(created.id, 2, RuleUpdate::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.update_rule(
                created.id,
                1,
                RuleUpdate {
                    pattern: Some(String::new()),
                    ..Default::default()
                }
            ),
            Err(Error::Validation(_))
        ));
    }
}
