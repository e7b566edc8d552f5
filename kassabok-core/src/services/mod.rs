//! Service layer - business logic orchestration
//!
//! The extraction, normalization, duplicate and rule modules are pure
//! functions over in-memory data. The service structs coordinate them
//! with the repository ports.

pub mod agreement;
pub mod catalog;
pub mod duplicate;
pub mod extract;
pub mod import;
pub mod logging;
pub mod migration;
pub mod normalize;
pub mod rules;

pub use agreement::{expand, schedule_months, AgreementService, CreatedAgreement};
pub use catalog::CatalogService;
pub use duplicate::{flag_duplicates, is_duplicate, DUPLICATE_TOLERANCE};
pub use extract::{StatementFormat, TabularExtractor, HEADER_MARKER, HEADER_SCAN_ROWS};
pub use import::{selection_total, ImportService};
pub use logging::{EntryPoint, EventFamily, FormatStats, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use normalize::{normalize, normalize_all};
pub use rules::{match_rule, resolve_suggestion, RuleService, Suggestion};
