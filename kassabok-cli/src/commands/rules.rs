//! Rules command - manage import rules

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;

use super::{get_context, get_logger, log_outcome, resolve_user};
use crate::output::{self, create_table, opt};
use kassabok_core::domain::RuleOrder;
use kassabok_core::{ImportRule, RuleUpdate};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in the order they are tested
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a rule matching descriptions that contain PATTERN
    Add {
        /// Text to look for (case-insensitive)
        pattern: String,
        /// Category to suggest
        #[arg(long)]
        category: Option<i64>,
        /// Supplier to suggest (also implies its category)
        #[arg(long)]
        supplier: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a rule
    Update {
        /// Rule ID
        id: i64,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<i64>,
        #[arg(long, conflicts_with = "clear_supplier")]
        supplier: Option<i64>,
        /// Remove the rule's category
        #[arg(long)]
        clear_category: bool,
        /// Remove the rule's supplier
        #[arg(long)]
        clear_supplier: bool,
        /// Enable or disable the rule
        #[arg(long)]
        active: Option<bool>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a rule
    Remove {
        /// Rule ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: RulesCommands, user: Option<i64>) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, user);
    let service = &ctx.rule_service;

    match command {
        RulesCommands::List { json } => {
            let mut rules = service.list_rules(user_id)?;
            if ctx.config.rule_order == RuleOrder::NewestFirst {
                rules.reverse();
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else if rules.is_empty() {
                println!("No import rules.");
            } else {
                print_rules(&rules);
                output::info("Active rules are tested top to bottom; the first match wins.");
            }
        }
        RulesCommands::Add { pattern, category, supplier, json } => {
            if category.is_none() && supplier.is_none() {
                output::warning("Rule has neither category nor supplier and will never suggest anything.");
            }
            let result = service.create_rule(user_id, &pattern, category, supplier);
            log_outcome(&logger, "rule_created", "rules add", &result);
            let rule = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rule)?);
            } else {
                output::success(&format!("Rule {} created", rule.id));
            }
        }
        RulesCommands::Update {
            id,
            pattern,
            category,
            supplier,
            clear_category,
            clear_supplier,
            active,
            json,
        } => {
            let update = RuleUpdate {
                pattern,
                category_id: if clear_category { Some(None) } else { category.map(Some) },
                supplier_id: if clear_supplier { Some(None) } else { supplier.map(Some) },
                active,
            };
            let result = service.update_rule(id, user_id, update);
            log_outcome(&logger, "rule_updated", "rules update", &result);
            let rule = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rule)?);
            } else {
                output::success(&format!("Rule {} updated", rule.id));
            }
        }
        RulesCommands::Remove { id, force } => {
            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete rule {}?", id))
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }

            let result = service.delete_rule(id, user_id);
            log_outcome(&logger, "rule_deleted", "rules remove", &result);
            result?;
            output::success(&format!("Rule {} deleted", id));
        }
    }

    Ok(())
}

fn print_rules(rules: &[ImportRule]) {
    let mut table = create_table();
    table.set_header(vec!["ID", "Pattern", "Category", "Supplier", "Active"]);
    for rule in rules {
        let active = if rule.active { "yes".green() } else { "no".dimmed() };
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(&rule.pattern),
            Cell::new(opt(rule.category_id)),
            Cell::new(opt(rule.supplier_id)),
            Cell::new(active),
        ]);
    }
    println!("{}", table);
}
