//! Tally CLI - Budgets and spending insights
//!
//! Usage:
//!   tally init                        Initialize database
//!   tally budgets add Food 400        Create a monthly budget
//!   tally tx add expense 32.50 Food   Record a transaction
//!   tally insights generate           Generate insights
//!   tally run                         Run scheduled reconciliation and insights

mod cli;
mod commands;
mod scheduler;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    if let Commands::Init = cli.command {
        return commands::cmd_init(&cli.db);
    }

    let services = commands::Services::open(&cli.db, cli.config.as_deref())?;
    let owner = cli.owner;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Budgets { action } => match action {
            None | Some(BudgetsAction::List) => commands::cmd_budgets_list(&services, owner),
            Some(BudgetsAction::Add {
                category,
                limit,
                period,
                name,
                thresholds,
                rollover,
                no_alerts,
            }) => commands::cmd_budgets_add(
                &services,
                commands::BudgetArgs {
                    owner,
                    category,
                    limit,
                    period,
                    name,
                    thresholds,
                    rollover,
                    alerts_enabled: !no_alerts,
                },
            ),
            Some(BudgetsAction::Edit {
                id,
                name,
                category,
                limit,
                period,
                thresholds,
                rollover,
                alerts,
            }) => commands::cmd_budgets_edit(
                &services,
                id,
                tally_core::BudgetUpdate {
                    name,
                    category,
                    limit,
                    period_kind: period,
                    rollover,
                    alerts_enabled: alerts,
                    thresholds,
                },
            ),
            Some(BudgetsAction::Delete { id }) => commands::cmd_budgets_delete(&services, id),
            Some(BudgetsAction::Resync { id }) => commands::cmd_budgets_resync(&services, id),
            Some(BudgetsAction::Show { id, json }) => {
                commands::cmd_budgets_show(&services, id, json)
            }
        },
        Commands::Tx { action } => match action {
            None => commands::cmd_tx_list(&services, owner, 20),
            Some(TxAction::List { limit }) => commands::cmd_tx_list(&services, owner, limit),
            Some(TxAction::Add {
                kind,
                amount,
                category,
                date,
                description,
                excluded,
            }) => {
                commands::cmd_tx_add(
                    &services,
                    owner,
                    kind,
                    amount,
                    &category,
                    date.as_deref(),
                    description,
                    excluded,
                )
                .await
            }
            Some(TxAction::Edit {
                id,
                kind,
                amount,
                category,
                date,
                description,
                excluded,
            }) => {
                let occurred_at = date.as_deref().map(commands::parse_date).transpose()?;
                commands::cmd_tx_edit(
                    &services,
                    id,
                    tally_core::TransactionUpdate {
                        kind,
                        amount,
                        category,
                        occurred_at,
                        excluded,
                        description,
                    },
                )
                .await
            }
            Some(TxAction::Delete { id }) => commands::cmd_tx_delete(&services, id).await,
        },
        Commands::Reconcile { log_only } => commands::cmd_reconcile(&services, log_only).await,
        Commands::Insights { action } => match action {
            None | Some(InsightsAction::List) => commands::cmd_insights_list(&services, owner),
            Some(InsightsAction::Generate { window, all }) => {
                if all {
                    commands::cmd_insights_batch(&services).await
                } else {
                    commands::cmd_insights_generate(&services, owner, window).await
                }
            }
        },
        Commands::Notifications { action } => match action {
            None => commands::cmd_notifications_list(&services, owner, false),
            Some(NotificationsAction::List { unread }) => {
                commands::cmd_notifications_list(&services, owner, unread)
            }
            Some(NotificationsAction::Read { id }) => {
                commands::cmd_notifications_read(&services, id)
            }
        },
        Commands::Run { log_only } => commands::cmd_run(services, log_only).await,
    }
}
