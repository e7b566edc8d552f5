//! Categories and suppliers commands

use std::collections::HashMap;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

use super::{get_context, get_logger, log_outcome};
use crate::output::{self, create_table};

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SuppliersCommands {
    /// List suppliers with their category
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a supplier under a category
    Add {
        name: String,
        /// Category ID the supplier belongs to
        #[arg(long)]
        category: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run_categories(command: CategoriesCommands) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match command {
        CategoriesCommands::List { json } => {
            let categories = ctx.catalog_service.list_categories()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
                return Ok(());
            }
            if categories.is_empty() {
                println!("No categories.");
                return Ok(());
            }
            let mut table = create_table();
            table.set_header(vec!["ID", "Name"]);
            for c in &categories {
                table.add_row(vec![Cell::new(c.id), Cell::new(&c.name)]);
            }
            println!("{}", table);
        }
        CategoriesCommands::Add { name, json } => {
            let result = ctx.catalog_service.add_category(&name);
            log_outcome(&logger, "category_created", "categories add", &result);
            let category = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                output::success(&format!("Category '{}' created (ID {})", category.name, category.id));
            }
        }
    }

    Ok(())
}

pub fn run_suppliers(command: SuppliersCommands) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match command {
        SuppliersCommands::List { json } => {
            let suppliers = ctx.catalog_service.list_suppliers()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&suppliers)?);
                return Ok(());
            }
            if suppliers.is_empty() {
                println!("No suppliers.");
                return Ok(());
            }
            let categories: HashMap<i64, String> = ctx
                .catalog_service
                .list_categories()?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect();

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Category"]);
            for s in &suppliers {
                let category = categories
                    .get(&s.category_id)
                    .cloned()
                    .unwrap_or_else(|| s.category_id.to_string());
                table.add_row(vec![Cell::new(s.id), Cell::new(&s.name), Cell::new(category)]);
            }
            println!("{}", table);
        }
        SuppliersCommands::Add { name, category, json } => {
            let result = ctx.catalog_service.add_supplier(&name, category);
            log_outcome(&logger, "supplier_created", "suppliers add", &result);
            let supplier = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&supplier)?);
            } else {
                output::success(&format!("Supplier '{}' created (ID {})", supplier.name, supplier.id));
            }
        }
    }

    Ok(())
}
