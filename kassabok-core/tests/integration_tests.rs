//! Integration tests for kassabok-core services
//!
//! These tests run the import and agreement flows against a real DuckDB
//! file in a temporary directory, wired the same way the CLI wires them.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;
use tempfile::TempDir;

use rust_decimal::Decimal;

use kassabok_core::adapters::duckdb::DuckDbRepository;
use kassabok_core::config::Config;
use kassabok_core::domain::{
    AgreementDraft, AgreementStatus, EntryType, Frequency, ImportSelection, RuleOrder,
};
use kassabok_core::ports::{CatalogRepository, LedgerRepository, RuleRepository};
use kassabok_core::{AgreementUpdatePolicy, Error, KassabokContext};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

/// Create a context over a fresh data directory with the given settings
fn create_test_context(temp_dir: &TempDir, config: &Config) -> KassabokContext {
    config.save(temp_dir.path()).expect("Failed to save settings");
    KassabokContext::new(temp_dir.path()).expect("Failed to open context")
}

/// Semicolon separated export with a title line
const MARCH_STATEMENT: &str = "Kontoutdrag 2025-03-01 - 2025-03-31\n\
    Bokföringsdag;Beskrivning;Belopp;Referens\n\
    2025-03-02;ICA MAXI STORMARKNAD;-412,30;\n\
    2025-03-05;Vattenfall AB;-1 250,00;OCR 4411\n\
    2025-03-15;Hyra mars;-9 500,00;\n\
    2025-03-25;Lön;32 000,00;\n\
    2025-03-26;;-10,00;\n";

fn agreement_draft(user_id: i64, category_id: i64, supplier_id: i64) -> AgreementDraft {
    AgreementDraft {
        user_id,
        name: "Hyra".to_string(),
        category_id,
        supplier_id,
        owner: None,
        start_month: "2025-01".to_string(),
        end_month: Some("2025-12".to_string()),
        cost_per_month: Decimal::new(-950000, 2),
        frequency: Frequency::Monthly,
        notes: None,
        status: AgreementStatus::Signed,
    }
}

fn semicolon_config() -> Config {
    Config {
        csv_delimiter: b';',
        ..Config::default()
    }
}

// ============================================================================
// Import Flow Tests
// ============================================================================

/// Preview, confirm, and re-import the same statement
#[test]
fn test_import_round_trip_flags_reimport() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, &semicolon_config());

    let home = ctx.catalog_service.add_category("Boende").unwrap();
    let food = ctx.catalog_service.add_category("Mat").unwrap();
    let ica = ctx.catalog_service.add_supplier("ICA", food.id).unwrap();
    let power = ctx.catalog_service.add_supplier("Vattenfall", home.id).unwrap();

    ctx.rule_service.create_rule(1, "ica", None, Some(ica.id)).unwrap();
    ctx.rule_service.create_rule(1, "vattenfall", None, Some(power.id)).unwrap();

    let preview = ctx
        .import_service
        .parse_statement(MARCH_STATEMENT.as_bytes(), "mars.csv", 1)
        .unwrap();

    assert_eq!(preview.summary.total, 4, "row without description is dropped");
    assert_eq!(preview.summary.duplicates, 0);
    assert_eq!(preview.summary.matched, 2);
    assert_eq!(preview.transactions[1].amount, Decimal::new(-125000, 2));
    assert_eq!(preview.transactions[1].suggested_category_id, Some(home.id));

    let selections: Vec<ImportSelection> = preview
        .transactions
        .into_iter()
        .filter(|tx| tx.has_suggestion())
        .map(ImportSelection::accept)
        .collect();
    let entries = ctx.import_service.confirm_import(1, selections).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].notes.as_deref(), Some("OCR 4411"));
    assert_eq!(entries[1].entry_type, EntryType::Expense);

    let again = ctx
        .import_service
        .parse_statement(MARCH_STATEMENT.as_bytes(), "mars.csv", 1)
        .unwrap();
    assert_eq!(again.summary.duplicates, 2);
    assert_eq!(again.summary.matched, 2);
}

/// Parsing writes nothing, however often it is called
#[test]
fn test_parse_statement_has_no_side_effects() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, &semicolon_config());
    ctx.rule_service.create_rule(1, "Lön", Some(1), None).unwrap();

    let first = ctx
        .import_service
        .parse_statement(MARCH_STATEMENT.as_bytes(), "mars.csv", 1)
        .unwrap();
    for _ in 0..3 {
        let next = ctx
            .import_service
            .parse_statement(MARCH_STATEMENT.as_bytes(), "mars.csv", 1)
            .unwrap();
        assert_eq!(next, first);
    }

    assert!(ctx.repository.get_entries_for_user(1).unwrap().is_empty());
    assert_eq!(ctx.repository.get_rules(1).unwrap().len(), 1);
    assert!(ctx.repository.list_categories().unwrap().is_empty());
}

/// Rule order from settings decides which of two overlapping rules wins
#[test]
fn test_rule_order_follows_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        rule_order: RuleOrder::NewestFirst,
        ..semicolon_config()
    };
    let ctx = create_test_context(&temp_dir, &config);

    ctx.rule_service.create_rule(1, "ICA", Some(10), None).unwrap();
    ctx.rule_service.create_rule(1, "ICA MAXI", Some(20), None).unwrap();

    let preview = ctx
        .import_service
        .parse_statement(MARCH_STATEMENT.as_bytes(), "mars.csv", 1)
        .unwrap();
    assert_eq!(preview.transactions[0].suggested_category_id, Some(20));
}

/// Unsupported and unreadable files abort the call
#[test]
fn test_parse_statement_rejects_bad_input() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, &Config::default());

    let err = ctx
        .import_service
        .parse_statement(b"%PDF-1.4", "statement.pdf", 1)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == "pdf"));

    let err = ctx
        .import_service
        .parse_statement(&[0xd0, 0xcf, 0x11, 0xe0, 0x00, 0x00], "statement.xls", 1)
        .unwrap_err();
    assert!(matches!(err, Error::Spreadsheet(_)));
}

// ============================================================================
// Agreement Tests
// ============================================================================

/// Delete removes the agreement's entries and nothing else
#[test]
fn test_agreement_delete_cascades_only_its_entries() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, &Config::default());

    let home = ctx.catalog_service.add_category("Boende").unwrap();
    let landlord = ctx.catalog_service.add_supplier("Hyresvärden", home.id).unwrap();

    let rent = ctx
        .agreement_service
        .create_agreement(agreement_draft(1, home.id, landlord.id))
        .unwrap();
    assert_eq!(rent.entries.len(), 12);
    assert_eq!(rent.entries[0].display_id, "A000001");
    assert_eq!(rent.entries[11].display_id, "A000012");

    let mut other_user = agreement_draft(2, home.id, landlord.id);
    other_user.frequency = Frequency::Annual;
    ctx.agreement_service.create_agreement(other_user).unwrap();

    let removed = ctx
        .agreement_service
        .delete_agreement(rent.agreement.id, 1)
        .unwrap();
    assert_eq!(removed, 12);
    assert!(ctx.repository.get_entries_for_user(1).unwrap().is_empty());
    assert_eq!(ctx.repository.get_entries_for_user(2).unwrap().len(), 1);
}

/// The update policy from settings controls what happens to entries
#[test]
fn test_regenerate_policy_from_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        agreement_update_policy: AgreementUpdatePolicy::Regenerate,
        ..Config::default()
    };
    let ctx = create_test_context(&temp_dir, &config);
    assert_eq!(ctx.agreement_service.policy(), AgreementUpdatePolicy::Regenerate);

    let created = ctx
        .agreement_service
        .create_agreement(agreement_draft(1, 1, 1))
        .unwrap();

    let mut edit = agreement_draft(1, 1, 1);
    edit.end_month = Some("2025-06".to_string());
    edit.frequency = Frequency::Quarterly;
    ctx.agreement_service
        .update_agreement(created.agreement.id, 1, edit)
        .unwrap();

    let months: Vec<String> = ctx
        .agreement_service
        .agreement_entries(created.agreement.id, 1)
        .unwrap()
        .into_iter()
        .map(|e| e.month)
        .collect();
    assert_eq!(months, vec!["2025-01", "2025-04"]);
}

/// Agreements and entries persist across reopening the database
#[test]
fn test_agreement_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let id = {
        let repo = create_test_repo(&temp_dir);
        let ctx = KassabokContext::with_repository(Config::default(), repo);
        ctx.agreement_service
            .create_agreement(agreement_draft(1, 1, 1))
            .unwrap()
            .agreement
            .id
    };

    let repo = create_test_repo(&temp_dir);
    let ctx = KassabokContext::with_repository(Config::default(), repo);

    let agreement = ctx.agreement_service.get_agreement(id, 1).unwrap();
    assert_eq!(agreement.status, AgreementStatus::Signed);
    assert_eq!(agreement.cost_per_month, Decimal::new(-950000, 2));
    assert_eq!(ctx.agreement_service.agreement_entries(id, 1).unwrap().len(), 12);
    assert_eq!(ctx.agreement_service.list_agreements(1).unwrap().len(), 1);
}
