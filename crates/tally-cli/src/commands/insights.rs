//! Insight command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use tally_core::{Impact, Insight, InsightRepository, InsightRequest, ProviderSource};
use tokio_util::sync::CancellationToken;

use super::Services;

fn impact_icon(impact: Impact) -> &'static str {
    match impact {
        Impact::High => "🔴",
        Impact::Medium => "🟡",
        Impact::Low => "🟢",
    }
}

fn print_insights(insights: &[Insight]) {
    for insight in insights {
        println!(
            "   {} {} ({:.0}% confidence)",
            impact_icon(insight.impact),
            insight.title,
            insight.confidence * 100.0
        );
        println!("      {}", insight.message);
    }
}

pub async fn cmd_insights_generate(
    services: &Services,
    owner: i64,
    window_days: Option<u32>,
) -> Result<()> {
    let now = Utc::now();
    let general_window_days =
        window_days.unwrap_or(services.config.insights.general_window_days);

    let snapshot = services
        .engine
        .snapshot(owner, now, general_window_days)
        .context("Failed to load ledger snapshot")?;
    let request = InsightRequest {
        owner_id: owner,
        now,
        general_window_days,
        snapshot,
    };

    let outcome = services
        .provider_chain()
        .generate(&request)
        .await
        .context("Insight generation failed")?;
    services.db.replace_insights(owner, &outcome.insights)?;

    let source = match outcome.source {
        ProviderSource::Primary => "insight service",
        ProviderSource::Fallback => "local engine",
    };

    println!();
    println!(
        "💡 {} insight(s) from the {} ({} day window)",
        outcome.insights.len(),
        source,
        general_window_days
    );
    println!("   ─────────────────────────────────────────────────────────────");
    if outcome.insights.is_empty() {
        println!("   Nothing stands out right now.");
    }
    print_insights(&outcome.insights);

    Ok(())
}

pub async fn cmd_insights_batch(services: &Services) -> Result<()> {
    println!("💡 Generating insights for all owners...");

    let report = services
        .insight_batch(false)
        .run_insight_batch(Utc::now(), &CancellationToken::new())
        .await
        .context("Insight batch failed")?;

    println!("   Owners:    {}", report.owners);
    println!("   Succeeded: {}", report.succeeded);
    println!("   Insights:  {}", report.insights);
    if report.from_primary > 0 {
        println!("   From insight service: {}", report.from_primary);
    }
    if report.failed > 0 {
        println!("   ❌ Failed: {}", report.failed);
    }

    Ok(())
}

pub fn cmd_insights_list(services: &Services, owner: i64) -> Result<()> {
    let insights = services.db.list_insights(owner, Utc::now())?;

    if insights.is_empty() {
        println!("No insights yet. Generate some with:");
        println!("  tally insights generate");
        return Ok(());
    }

    println!();
    println!("💡 Insights");
    println!("   ─────────────────────────────────────────────────────────────");
    print_insights(&insights);

    Ok(())
}
