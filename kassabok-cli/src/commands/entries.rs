//! Entries command - list ledger entries

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Cell;
use rust_decimal::Decimal;

use super::{get_context, resolve_user};
use crate::output::{amount_cell, create_table, format_amount, opt};
use kassabok_core::domain::month::validate_month;
use kassabok_core::ports::LedgerRepository;

pub fn run(user: Option<i64>, month: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, user);

    if let Some(m) = &month {
        validate_month("--month", m).context("Invalid --month")?;
    }

    let entries: Vec<_> = ctx
        .repository
        .get_entries_for_user(user_id)?
        .into_iter()
        .filter(|e| month.as_deref().map_or(true, |m| e.month == m))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Month", "Name", "Amount", "Type", "Category", "Supplier", "Agreement"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(&e.display_id),
            Cell::new(&e.month),
            Cell::new(&e.name),
            amount_cell(e.amount),
            Cell::new(e.entry_type.as_str()),
            Cell::new(opt(e.category_id)),
            Cell::new(opt(e.supplier_id)),
            Cell::new(if e.agreement_id.is_some() { "yes" } else { "" }),
        ]);
    }
    println!("{}", table);

    let total: Decimal = entries.iter().map(|e| e.amount).sum();
    println!("  {} entries, total {}", entries.len(), format_amount(total).bold());

    Ok(())
}
