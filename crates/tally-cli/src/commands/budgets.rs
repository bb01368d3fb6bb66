//! Budget command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tally_core::models::{available, percentage_used, remaining, status};
use tally_core::{Budget, BudgetRepository, BudgetStatus, BudgetUpdate, NewBudget, PeriodKind};

use super::{truncate, Services};

/// Arguments for `budgets add`
pub struct BudgetArgs {
    pub owner: i64,
    pub category: String,
    pub limit: Decimal,
    pub period: PeriodKind,
    pub name: Option<String>,
    pub thresholds: Option<Vec<Decimal>>,
    pub rollover: bool,
    pub alerts_enabled: bool,
}

fn status_icon(status: BudgetStatus) -> &'static str {
    match status {
        BudgetStatus::Good => "🟢",
        BudgetStatus::Warning => "🟡",
        BudgetStatus::Critical => "🟠",
        BudgetStatus::Exceeded => "🔴",
    }
}

fn print_budget_line(budget: &Budget) {
    println!(
        "   [{}] {} {:<20} │ ${:>9.2} / ${:<9.2} │ {:>5.1}% │ {} ({})",
        budget.id,
        status_icon(status(budget)),
        truncate(&budget.name, 20),
        budget.spent,
        budget.limit,
        percentage_used(budget),
        budget.period_kind,
        budget.period.start.format("%Y-%m-%d"),
    );
}

pub fn cmd_budgets_list(services: &Services, owner: i64) -> Result<()> {
    let budgets = services.db.list_for_owner(owner)?;

    if budgets.is_empty() {
        println!("No budgets yet. Create one with:");
        println!("  tally budgets add Food 400");
        return Ok(());
    }

    println!();
    println!("💰 Budgets");
    println!("   ─────────────────────────────────────────────────────────────");
    for budget in &budgets {
        print_budget_line(budget);
    }

    Ok(())
}

pub fn cmd_budgets_add(services: &Services, args: BudgetArgs) -> Result<()> {
    let thresholds = args
        .thresholds
        .unwrap_or_else(|| services.config.alerts.default_thresholds.clone());
    let new = NewBudget {
        name: args.name,
        rollover: args.rollover,
        alerts_enabled: args.alerts_enabled,
        ..NewBudget::new(args.owner, &args.category, args.limit, args.period)
    }
    .with_thresholds(thresholds);

    let budget = services
        .tracker
        .create_budget(new, Utc::now())
        .context("Failed to create budget")?;

    println!("✅ Created budget {}:", budget.id);
    print_budget_line(&budget);

    // Existing spend may already be past a threshold
    if let Some(event) = services.evaluator.evaluate_budget(budget.id)? {
        println!("   ⚠️  {}", event.message);
    }

    Ok(())
}

pub fn cmd_budgets_edit(services: &Services, id: i64, update: BudgetUpdate) -> Result<()> {
    let budget = services
        .tracker
        .update_budget(id, update, Utc::now())
        .with_context(|| format!("Failed to update budget {}", id))?;

    println!("✅ Updated budget {}:", id);
    print_budget_line(&budget);

    if let Some(event) = services.evaluator.evaluate_budget(id)? {
        println!("   ⚠️  {}", event.message);
    }

    Ok(())
}

pub fn cmd_budgets_delete(services: &Services, id: i64) -> Result<()> {
    let budget = services.db.get_budget(id)?;
    services.tracker.delete_budget(id)?;

    println!("🗑️  Deleted budget {} ({})", id, budget.name);
    Ok(())
}

pub fn cmd_budgets_resync(services: &Services, id: i64) -> Result<()> {
    let before = services.db.get_budget(id)?;
    let budget = services.tracker.resync(id)?;

    if before.spent == budget.spent {
        println!("✅ Budget {} is in sync (${:.2})", id, budget.spent);
    } else {
        println!(
            "🔄 Budget {} corrected: ${:.2} → ${:.2}",
            id, before.spent, budget.spent
        );
    }
    Ok(())
}

pub fn cmd_budgets_show(services: &Services, id: i64, json: bool) -> Result<()> {
    let budget = services.db.get_budget(id)?;
    let carry = services.tracker.carry_over(&budget)?;

    if json {
        let value = serde_json::json!({
            "budget": budget,
            "status": status(&budget),
            "percentage_used": percentage_used(&budget),
            "remaining": remaining(&budget),
            "carry_over": carry,
            "available": available(&budget, carry),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let thresholds: Vec<String> = budget.thresholds.iter().map(|t| format!("{}%", t)).collect();

    println!();
    println!("💰 {} ({})", budget.name, budget.category);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Period:     {} {}", budget.period_kind, budget.period);
    println!("   Limit:      ${:.2}", budget.limit);
    println!("   Spent:      ${:.2}", budget.spent);
    println!("   Remaining:  ${:.2}", remaining(&budget));
    println!(
        "   Status:     {} {} ({:.1}%)",
        status_icon(status(&budget)),
        status(&budget),
        percentage_used(&budget)
    );
    if budget.rollover {
        println!("   Carry-over: ${:.2}", carry);
        println!("   Available:  ${:.2}", available(&budget, carry));
    }
    if budget.alerts_enabled {
        println!("   Alerts:     {}", thresholds.join(", "));
        if let Some(level) = budget.last_notified_level {
            println!("   Last alert: {}", level);
        }
    } else {
        println!("   Alerts:     disabled");
    }

    Ok(())
}
