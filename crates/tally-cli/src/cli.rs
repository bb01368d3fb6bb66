//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tally_core::{PeriodKind, TransactionKind};

/// Tally - Budgets and spending insights
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Budget tracking with threshold alerts and spending insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to ~/.local/share/tally/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Owner the command acts for
    #[arg(long, default_value = "1", global = true)]
    pub owner: i64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage budgets (list, add, edit, delete, resync, show)
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Manage ledger transactions (list, add, edit, delete)
    Tx {
        #[command(subcommand)]
        action: Option<TxAction>,
    },

    /// Resync and evaluate every budget once
    Reconcile {
        /// Log alerts instead of writing them to the inbox
        #[arg(long)]
        log_only: bool,
    },

    /// Generate or list spending insights
    Insights {
        #[command(subcommand)]
        action: Option<InsightsAction>,
    },

    /// Show or acknowledge notifications
    Notifications {
        #[command(subcommand)]
        action: Option<NotificationsAction>,
    },

    /// Run the scheduler until Ctrl-C
    Run {
        /// Log notifications instead of writing them to the inbox
        #[arg(long)]
        log_only: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// List budgets with their current spend
    List,

    /// Create a budget for the current period
    Add {
        /// Category the budget tracks
        category: String,

        /// Spending limit for one period
        limit: Decimal,

        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: PeriodKind,

        /// Display name (defaults to the category)
        #[arg(short, long)]
        name: Option<String>,

        /// Alert thresholds in percent, e.g. 50,80,100
        #[arg(short, long, value_delimiter = ',')]
        thresholds: Option<Vec<Decimal>>,

        /// Report unused amount from the previous period
        #[arg(long)]
        rollover: bool,

        /// Never fire alerts for this budget
        #[arg(long)]
        no_alerts: bool,
    },

    /// Edit a budget; changing category or period resets its spend
    Edit {
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        limit: Option<Decimal>,

        #[arg(short, long)]
        period: Option<PeriodKind>,

        #[arg(short, long, value_delimiter = ',')]
        thresholds: Option<Vec<Decimal>>,

        #[arg(long)]
        rollover: Option<bool>,

        #[arg(long)]
        alerts: Option<bool>,
    },

    /// Delete a budget
    Delete { id: i64 },

    /// Recompute a budget's spend from the ledger
    Resync { id: i64 },

    /// Show one budget in detail
    Show {
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TxAction {
    /// List recent transactions
    List {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Record a transaction
    Add {
        /// income or expense
        kind: TransactionKind,

        amount: Decimal,

        category: String,

        /// Date (YYYY-MM-DD, defaults to now)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Keep out of budgets and insights
        #[arg(long)]
        excluded: bool,
    },

    /// Edit a transaction
    Edit {
        id: i64,

        #[arg(long)]
        kind: Option<TransactionKind>,

        #[arg(short, long)]
        amount: Option<Decimal>,

        #[arg(short, long)]
        category: Option<String>,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        excluded: Option<bool>,
    },

    /// Delete a transaction
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum InsightsAction {
    /// Generate insights now
    Generate {
        /// Lookback window in days for general insights
        #[arg(short, long)]
        window: Option<u32>,

        /// Run the batch for every owner
        #[arg(long)]
        all: bool,
    },

    /// List stored, unexpired insights
    List,
}

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List notifications, newest first
    List {
        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read { id: i64 },
}
