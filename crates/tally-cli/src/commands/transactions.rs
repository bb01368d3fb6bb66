//! Transaction command implementations
//!
//! Every ledger write is followed by the budget monitor, which updates spend
//! and fires alerts. Monitor failures never undo the write.

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tally_core::{AlertEvent, LedgerEvent, NewTransaction, TransactionKind, TransactionUpdate};

use super::{parse_date, truncate, Services};

fn report_alerts(alerts: &[AlertEvent]) {
    for alert in alerts {
        println!("   ⚠️  {}", alert.message);
    }
}

pub fn cmd_tx_list(services: &Services, owner: i64, limit: i64) -> Result<()> {
    let transactions = services.db.list_transactions(owner, limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  tally tx add expense 32.50 Food");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.kind {
            TransactionKind::Expense => format!("\x1b[31m-${:.2}\x1b[0m", tx.amount), // Red for expenses
            TransactionKind::Income => format!("\x1b[32m+${:.2}\x1b[0m", tx.amount), // Green for income
        };
        let excluded = if tx.excluded { " (excluded)" } else { "" };

        println!(
            "   [{}] {} │ {:>10} │ {:<15} │ {}{}",
            tx.id,
            tx.occurred_at.format("%Y-%m-%d"),
            amount_str,
            truncate(&tx.category, 15),
            truncate(tx.description.as_deref().unwrap_or(""), 30),
            excluded
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_tx_add(
    services: &Services,
    owner: i64,
    kind: TransactionKind,
    amount: Decimal,
    category: &str,
    date: Option<&str>,
    description: Option<String>,
    excluded: bool,
) -> Result<()> {
    let occurred_at = match date {
        Some(date) => parse_date(date)?,
        None => Utc::now(),
    };
    let tx = services
        .db
        .insert_transaction(&NewTransaction {
            owner_id: owner,
            kind,
            amount,
            category: category.to_string(),
            occurred_at,
            excluded,
            description,
        })
        .context("Failed to record transaction")?;

    println!(
        "✅ Recorded {} {} of ${:.2} in {}",
        tx.kind, tx.id, tx.amount, tx.category
    );

    let alerts = services.monitor().handle(&LedgerEvent::Created(tx)).await;
    report_alerts(&alerts);
    Ok(())
}

pub async fn cmd_tx_edit(services: &Services, id: i64, update: TransactionUpdate) -> Result<()> {
    let old = services.db.get_transaction(id)?;
    let new = update
        .apply_to(&old)
        .with_context(|| format!("Invalid edit for transaction {}", id))?;
    services.db.update_transaction(&new)?;

    println!("✅ Updated transaction {}", id);

    let alerts = services
        .monitor()
        .handle(&LedgerEvent::Updated { old, new })
        .await;
    report_alerts(&alerts);
    Ok(())
}

pub async fn cmd_tx_delete(services: &Services, id: i64) -> Result<()> {
    let tx = services
        .db
        .delete_transaction(id)
        .with_context(|| format!("Failed to delete transaction {}", id))?;

    println!(
        "🗑️  Deleted transaction {} (${:.2} in {})",
        id, tx.amount, tx.category
    );

    services.monitor().handle(&LedgerEvent::Deleted(tx)).await;
    Ok(())
}
