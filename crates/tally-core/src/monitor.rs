//! Ledger mutation flow: tracker, then evaluator, then dispatcher
//!
//! Nothing here can fail the ledger write that produced the event. Tracker
//! errors are logged and left for the next resync; dispatch is best-effort.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::alerts::AlertEvaluator;
use crate::models::{AlertEvent, LedgerEvent};
use crate::notify::{deliver_best_effort, Notification, NotificationDispatcher};
use crate::tracker::BudgetSpendTracker;

pub struct BudgetMonitor {
    tracker: Arc<BudgetSpendTracker>,
    evaluator: Arc<AlertEvaluator>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    dispatch_timeout: Duration,
}

impl BudgetMonitor {
    pub fn new(
        tracker: Arc<BudgetSpendTracker>,
        evaluator: Arc<AlertEvaluator>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            tracker,
            evaluator,
            dispatcher,
            dispatch_timeout,
        }
    }

    pub fn tracker(&self) -> &Arc<BudgetSpendTracker> {
        &self.tracker
    }

    /// React to a committed ledger change, returning the alerts that fired
    pub async fn handle(&self, event: &LedgerEvent) -> Vec<AlertEvent> {
        let owner_id = event.owner_id();
        let changed = match self.tracker.apply(event) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(owner_id, error = %e, "Incremental spend update failed");
                return vec![];
            }
        };

        let mut fired = vec![];
        for budget_id in changed {
            match self.evaluator.evaluate_budget(budget_id) {
                Ok(Some(event)) => fired.push(event),
                Ok(None) => {}
                Err(e) => warn!(budget_id, error = %e, "Alert evaluation failed"),
            }
        }

        for event in &fired {
            let notification = Notification::Alert(event.clone());
            deliver_best_effort(
                self.dispatcher.as_ref(),
                event.owner_id,
                &notification,
                self.dispatch_timeout,
            )
            .await;
        }

        fired
    }
}
