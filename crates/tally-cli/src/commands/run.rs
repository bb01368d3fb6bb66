//! Long-running scheduler command

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::Services;
use crate::scheduler::Scheduler;

/// Register the reconciliation, insight and weekly summary units
pub fn build_scheduler(services: &Services, log_only: bool) -> Scheduler {
    let cadence = &services.config.scheduler;
    let reconciler = Arc::new(services.reconciler(log_only));
    let batch = Arc::new(services.insight_batch(log_only));
    let summaries = Arc::new(services.weekly_summaries(log_only));

    let mut scheduler = Scheduler::new();

    scheduler.register(
        "reconcile",
        Duration::from_secs(cadence.reconcile_interval_minutes * 60),
        true,
        move |_| {
            let reconciler = reconciler.clone();
            async move {
                let report = reconciler.run_periodic_reconciliation(Utc::now()).await?;
                Ok::<_, anyhow::Error>(format!(
                    "Reconciled {} budgets ({} corrected, {} alerts, {} failed)",
                    report.budgets, report.corrected, report.alerts, report.failed
                ))
            }
        },
    );

    scheduler.register(
        "insights",
        Duration::from_secs(cadence.insight_interval_hours * 3600),
        false,
        move |cancel| {
            let batch = batch.clone();
            async move {
                let report = batch.run_insight_batch(Utc::now(), &cancel).await?;
                Ok::<_, anyhow::Error>(format!(
                    "Generated {} insights for {} owners ({} failed, {} skipped)",
                    report.insights, report.succeeded, report.failed, report.skipped
                ))
            }
        },
    );

    scheduler.register(
        "weekly-summary",
        Duration::from_secs(cadence.summary_interval_hours * 3600),
        false,
        move |cancel| {
            let summaries = summaries.clone();
            async move {
                let report = summaries.run(Utc::now(), &cancel).await?;
                Ok::<_, anyhow::Error>(format!(
                    "Sent {} weekly summaries ({} quiet, {} failed)",
                    report.delivered, report.quiet, report.failed
                ))
            }
        },
    );

    scheduler
}

pub async fn cmd_run(services: Services, log_only: bool) -> Result<()> {
    let scheduler = build_scheduler(&services, log_only);
    if services.config.provider.service_url.is_some() {
        info!("Remote insight service enabled, local engine as fallback");
    }

    println!("⏱️  Scheduler running ({}). Press Ctrl-C to stop.", scheduler.unit_names().join(", "));

    let cancel = CancellationToken::new();
    let mut tasks = scheduler.start(cancel.clone());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down scheduler...");
    cancel.cancel();

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Scheduled unit panicked: {}", e);
        }
    }

    println!("👋 Scheduler stopped");
    Ok(())
}
