//! Agreements command - recurring obligations and their schedule

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{get_context, get_logger, log_outcome, resolve_user};
use crate::output::{self, amount_cell, create_table, opt};
use kassabok_core::{Agreement, AgreementDraft, AgreementStatus, Frequency, LedgerEntry};

#[derive(Subcommand)]
pub enum AgreementsCommands {
    /// List agreements
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show an agreement and its generated entries
    Show {
        /// Agreement ID
        id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an agreement and generate its ledger entries
    Add {
        #[command(flatten)]
        fields: AgreementFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace fields of an agreement
    Update {
        /// Agreement ID
        id: Uuid,
        #[command(flatten)]
        fields: AgreementFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an agreement and every entry it generated
    Remove {
        /// Agreement ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Agreement fields; on update, omitted flags keep their current value
#[derive(Args)]
pub struct AgreementFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<i64>,
    #[arg(long)]
    supplier: Option<i64>,
    /// First billing month (YYYY-MM)
    #[arg(long)]
    start: Option<String>,
    /// Last billing month (YYYY-MM), defaults to the start month
    #[arg(long)]
    end: Option<String>,
    /// Amount written for each billing month
    #[arg(long, allow_hyphen_values = true)]
    cost: Option<Decimal>,
    /// Månadsvis, Kvartalsvis, Halvårsvis or Årligen
    #[arg(long)]
    frequency: Option<Frequency>,
    /// aktiv, avslutad, undertecknad or "väntar på motpart"
    #[arg(long)]
    status: Option<AgreementStatus>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl AgreementFields {
    fn into_new_draft(self, user_id: i64) -> Result<AgreementDraft> {
        Ok(AgreementDraft {
            user_id,
            name: self.name.context("--name is required")?,
            category_id: self.category.context("--category is required")?,
            supplier_id: self.supplier.context("--supplier is required")?,
            owner: self.owner,
            start_month: self.start.context("--start is required")?,
            end_month: self.end,
            cost_per_month: self.cost.context("--cost is required")?,
            frequency: self.frequency.unwrap_or_default(),
            notes: self.notes,
            status: self.status.unwrap_or_default(),
        })
    }

    fn merge_into(self, current: Agreement) -> AgreementDraft {
        AgreementDraft {
            user_id: current.user_id,
            name: self.name.unwrap_or(current.name),
            category_id: self.category.unwrap_or(current.category_id),
            supplier_id: self.supplier.unwrap_or(current.supplier_id),
            owner: self.owner.or(current.owner),
            start_month: self.start.unwrap_or(current.start_month),
            end_month: self.end.or(current.end_month),
            cost_per_month: self.cost.unwrap_or(current.cost_per_month),
            frequency: self.frequency.unwrap_or(current.frequency),
            notes: self.notes.or(current.notes),
            status: self.status.unwrap_or(current.status),
        }
    }
}

pub fn run(command: AgreementsCommands, user: Option<i64>) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, user);
    let service = &ctx.agreement_service;

    match command {
        AgreementsCommands::List { json } => {
            let agreements = service.list_agreements(user_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&agreements)?);
            } else if agreements.is_empty() {
                println!("No agreements.");
            } else {
                print_agreements(&agreements);
            }
        }
        AgreementsCommands::Show { id, json } => {
            let agreement = service.get_agreement(id, user_id)?;
            let entries = service.agreement_entries(id, user_id)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "agreement": agreement, "entries": entries })
                );
            } else {
                print_agreements(std::slice::from_ref(&agreement));
                if let Some(notes) = &agreement.notes {
                    println!("  {}", notes.dimmed());
                }
                print_entries(&entries);
            }
        }
        AgreementsCommands::Add { fields, json } => {
            let draft = fields.into_new_draft(user_id)?;
            let result = service.create_agreement(draft);
            log_outcome(&logger, "agreement_created", "agreements add", &result);
            let created = result?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({ "agreement": created.agreement, "entries": created.entries })
                );
            } else {
                output::success(&format!(
                    "Agreement {} created with {} entries",
                    created.agreement.id,
                    created.entries.len()
                ));
            }
        }
        AgreementsCommands::Update { id, fields, json } => {
            let current = service.get_agreement(id, user_id)?;
            let draft = fields.merge_into(current);
            let result = service.update_agreement(id, user_id, draft);
            log_outcome(&logger, "agreement_updated", "agreements update", &result);
            let agreement = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&agreement)?);
            } else {
                output::success(&format!("Agreement {} updated", agreement.id));
                match service.policy() {
                    kassabok_core::AgreementUpdatePolicy::Snapshot => {
                        output::info("Existing entries were kept as generated (updatePolicy: snapshot).")
                    }
                    kassabok_core::AgreementUpdatePolicy::Regenerate => {
                        output::info("Entries were regenerated (updatePolicy: regenerate).")
                    }
                }
            }
        }
        AgreementsCommands::Remove { id, force } => {
            let agreement = service.get_agreement(id, user_id)?;
            if !force {
                println!(
                    "\n{}",
                    format!("This will delete '{}' and all entries it generated.", agreement.name).yellow()
                );
                if !Confirm::new().with_prompt("Are you sure?").default(false).interact()? {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            let result = service.delete_agreement(id, user_id);
            log_outcome(&logger, "agreement_deleted", "agreements remove", &result);
            let removed = result?;
            output::success(&format!("Agreement deleted, {} entries removed", removed));
        }
    }

    Ok(())
}

fn print_agreements(agreements: &[Agreement]) {
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Period", "Cost", "Frequency", "Status", "Owner"]);
    for a in agreements {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(&a.name),
            Cell::new(format!("{} to {}", a.start_month, a.effective_end_month())),
            amount_cell(a.cost_per_month),
            Cell::new(a.frequency),
            Cell::new(a.status),
            Cell::new(opt(a.owner.as_ref())),
        ]);
    }
    println!("{}", table);
}

fn print_entries(entries: &[LedgerEntry]) {
    if entries.is_empty() {
        output::warning("No generated entries.");
        return;
    }
    let mut table = create_table();
    table.set_header(vec!["ID", "Month", "Amount"]);
    for e in entries {
        table.add_row(vec![Cell::new(&e.display_id), Cell::new(&e.month), amount_cell(e.amount)]);
    }
    println!("{}", table);
}
