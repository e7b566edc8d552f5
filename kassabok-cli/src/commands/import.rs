//! Import command - preview and import bank statements

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;

use super::{get_context, get_logger, log_event, log_outcome, resolve_user};
use crate::output::{self, amount_cell, create_table, opt};
use kassabok_core::services::{selection_total, StatementFormat};
use kassabok_core::{ImportPreview, ImportSelection, KassabokContext, LogEvent};

pub fn run(file: &Path, user: Option<i64>, confirm: bool, yes: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, user);

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let buffer = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let format = StatementFormat::from_filename(&filename)
        .map(|f| f.as_str())
        .unwrap_or("unknown");

    let preview = match ctx.import_service.parse_statement(&buffer, &filename, user_id) {
        Ok(preview) => {
            log_event(&logger, LogEvent::new("statement_parsed").with_command("import").with_format(format));
            preview
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("statement_parse_failed")
                    .with_command("import")
                    .with_format(format)
                    .with_error(e.to_string()),
            );
            return Err(e).context("Failed to parse statement");
        }
    };

    if !confirm {
        if json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&ctx, &preview)?;
        }
        return Ok(());
    }

    let selections: Vec<ImportSelection> = preview
        .transactions
        .iter()
        .filter(|tx| !tx.is_duplicate && tx.has_suggestion())
        .cloned()
        .map(ImportSelection::accept)
        .collect();

    if selections.is_empty() {
        if json {
            println!("{}", serde_json::json!({ "imported": 0, "summary": preview.summary }));
        } else {
            output::warning("Nothing to import: no new transactions with a category or supplier.");
        }
        return Ok(());
    }

    if !yes && !json {
        print_preview(&ctx, &preview)?;
        let prompt = format!(
            "Import {} transactions totalling {}?",
            selections.len(),
            output::format_amount(selection_total(&selections))
        );
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let result = ctx.import_service.confirm_import(user_id, selections);
    log_outcome(&logger, "import_confirmed", "import", &result);
    let entries = result?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "imported": entries.len(), "entries": entries, "summary": preview.summary })
        );
    } else {
        output::success(&format!("Imported {} transactions", entries.len()));
        let skipped = preview.summary.total - entries.len();
        if skipped > 0 {
            println!("  {} skipped (duplicates or no suggestion)", skipped.to_string().dimmed());
        }
    }

    Ok(())
}

fn print_preview(ctx: &KassabokContext, preview: &ImportPreview) -> Result<()> {
    let categories: HashMap<i64, String> = ctx
        .catalog_service
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let suppliers: HashMap<i64, String> = ctx
        .catalog_service
        .list_suppliers()?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    if preview.transactions.is_empty() {
        output::warning("No transactions found in statement.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Date", "Description", "Amount", "Category", "Supplier", ""]);

    for tx in &preview.transactions {
        let status = if tx.is_duplicate {
            "duplicate".yellow().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(&tx.date),
            Cell::new(&tx.description),
            amount_cell(tx.amount),
            Cell::new(opt(tx.suggested_category_id.and_then(|id| categories.get(&id)))),
            Cell::new(opt(tx.suggested_supplier_id.and_then(|id| suppliers.get(&id)))),
            Cell::new(status),
        ]);
    }

    println!("{}", table);
    output::info(&format!(
        "{} transactions, {} probable duplicates, {} matched by rules",
        preview.summary.total, preview.summary.duplicates, preview.summary.matched
    ));
    Ok(())
}
