//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the ledger, rule, catalog and agreement repositories

pub mod duckdb;
