//! One-off reconciliation pass

use anyhow::{Context, Result};
use chrono::Utc;

use super::Services;

pub async fn cmd_reconcile(services: &Services, log_only: bool) -> Result<()> {
    println!("🔄 Reconciling budgets...");

    let report = services
        .reconciler(log_only)
        .run_periodic_reconciliation(Utc::now())
        .await
        .context("Reconciliation failed")?;

    println!();
    println!("📊 Reconciliation Results");
    println!("   ─────────────────────────────");
    println!("   Budgets checked:   {}", report.budgets);
    println!("   Periods rolled:    {}", report.rolled);
    println!("   Drift corrected:   {}", report.corrected);
    println!("   Alerts fired:      {}", report.alerts);
    if report.failed > 0 {
        println!("   ❌ Failed:         {}", report.failed);
    }

    Ok(())
}
