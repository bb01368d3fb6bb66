//! Budget spend tracking
//!
//! `BudgetSpendTracker` keeps each budget's `spent` equal to the sum of the
//! owner's non-excluded expenses in the budget's category whose `occurred_at`
//! falls inside the budget's stored period. Ledger events apply cheap
//! deltas; `resync` recomputes from the ledger and is the correctness
//! backstop run by periodic reconciliation.
//!
//! A transaction counts toward every budget of its owner and category whose
//! period contains it, so overlapping budgets (a weekly and a monthly "Food"
//! budget, say) each see the same expense.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::locks::BudgetLocks;
use crate::models::{
    rollover_carry, round_money, Budget, BudgetUpdate, LedgerEvent, NewBudget, Transaction,
    TransactionKind,
};
use crate::period::{bounds_for, previous_bounds};
use crate::repository::{BudgetRepository, LedgerRepository};

/// Amount `tx` adds to `budget`'s spend
pub fn contribution(budget: &Budget, tx: &Transaction) -> Decimal {
    if tx.is_countable_expense()
        && tx.owner_id == budget.owner_id
        && tx.category == budget.category
        && budget.period.contains(tx.occurred_at)
    {
        tx.amount
    } else {
        Decimal::ZERO
    }
}

/// Maintains `spent` for every budget
pub struct BudgetSpendTracker {
    ledger: Arc<dyn LedgerRepository>,
    budgets: Arc<dyn BudgetRepository>,
    locks: Arc<BudgetLocks>,
}

impl BudgetSpendTracker {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        budgets: Arc<dyn BudgetRepository>,
        locks: Arc<BudgetLocks>,
    ) -> Self {
        Self {
            ledger,
            budgets,
            locks,
        }
    }

    pub fn budgets(&self) -> &Arc<dyn BudgetRepository> {
        &self.budgets
    }

    pub fn on_transaction_created(&self, tx: &Transaction) -> Result<Vec<i64>> {
        self.apply_change(None, Some(tx))
    }

    pub fn on_transaction_updated(&self, old: &Transaction, new: &Transaction) -> Result<Vec<i64>> {
        self.apply_change(Some(old), Some(new))
    }

    pub fn on_transaction_deleted(&self, tx: &Transaction) -> Result<Vec<i64>> {
        self.apply_change(Some(tx), None)
    }

    /// Apply a ledger event, returning the ids of budgets whose spend changed
    pub fn apply(&self, event: &LedgerEvent) -> Result<Vec<i64>> {
        match event {
            LedgerEvent::Created(tx) => self.on_transaction_created(tx),
            LedgerEvent::Updated { old, new } => self.on_transaction_updated(old, new),
            LedgerEvent::Deleted(tx) => self.on_transaction_deleted(tx),
        }
    }

    fn apply_change(
        &self,
        old: Option<&Transaction>,
        new: Option<&Transaction>,
    ) -> Result<Vec<i64>> {
        // Every budget keyed by the old or new category is a candidate
        let mut candidates = BTreeSet::new();
        for tx in old.iter().chain(new.iter()) {
            for budget in self.budgets.list_for_category(tx.owner_id, &tx.category)? {
                candidates.insert(budget.id);
            }
        }

        let mut changed = Vec::new();
        for budget_id in candidates {
            let updated = self.locks.with_lock(budget_id, || -> Result<bool> {
                // Reload under the lock so the delta lands on current state
                let budget = self.budgets.get_budget(budget_id)?;
                let delta = new.map_or(Decimal::ZERO, |tx| contribution(&budget, tx))
                    - old.map_or(Decimal::ZERO, |tx| contribution(&budget, tx));
                if delta.is_zero() {
                    return Ok(false);
                }

                let mut spent = round_money(budget.spent + delta);
                if spent < Decimal::ZERO {
                    warn!(
                        budget_id,
                        stored = %budget.spent,
                        delta = %delta,
                        "Spend drift detected, clamping to zero until next resync"
                    );
                    spent = Decimal::ZERO;
                }
                self.budgets.set_spent(budget_id, spent)?;
                debug!(budget_id, delta = %delta, spent = %spent, "Applied spend delta");
                Ok(true)
            })?;

            if updated {
                changed.push(budget_id);
            }
        }

        Ok(changed)
    }

    /// Recompute a budget's spend from the ledger and store it
    pub fn resync(&self, budget_id: i64) -> Result<Budget> {
        self.locks.with_lock(budget_id, || {
            let mut budget = self.budgets.get_budget(budget_id)?;
            self.store_recomputed(&mut budget)?;
            Ok(budget)
        })
    }

    /// Like `resync`, for a caller already holding the budget
    pub fn resync_budget(&self, budget: &mut Budget) -> Result<()> {
        self.locks
            .with_lock(budget.id, || self.store_recomputed(budget))
    }

    fn store_recomputed(&self, budget: &mut Budget) -> Result<()> {
        let actual = self.compute_spent(budget)?;
        if actual != budget.spent {
            debug!(
                budget_id = budget.id,
                stored = %budget.spent,
                actual = %actual,
                "Resync corrected spend"
            );
        }
        self.budgets.set_spent(budget.id, actual)?;
        budget.spent = actual;
        Ok(())
    }

    fn compute_spent(&self, budget: &Budget) -> Result<Decimal> {
        let transactions = self.ledger.find_matching(
            budget.owner_id,
            Some(&budget.category),
            Some(TransactionKind::Expense),
            &budget.period,
        )?;
        Ok(round_money(transactions.iter().map(|tx| tx.amount).sum()))
    }

    /// Validate, store and initialize a new budget for the period containing `now`
    pub fn create_budget(&self, new: NewBudget, now: DateTime<Utc>) -> Result<Budget> {
        let period = bounds_for(new.period_kind, now);
        let mut budget = new.into_budget(period, now)?;
        budget.id = self.budgets.insert_budget(&budget)?;
        self.resync_budget(&mut budget)?;

        info!(
            budget_id = budget.id,
            owner_id = budget.owner_id,
            category = %budget.category,
            period = %budget.period,
            spent = %budget.spent,
            "Created budget"
        );
        Ok(budget)
    }

    /// Edit a budget
    ///
    /// Changing the category or period kind moves the budget to the period
    /// containing `now` and rebuilds its spend and alert state. Other edits
    /// keep both.
    pub fn update_budget(
        &self,
        budget_id: i64,
        update: BudgetUpdate,
        now: DateTime<Utc>,
    ) -> Result<Budget> {
        self.locks.with_lock(budget_id, || {
            let mut budget = self.budgets.get_budget(budget_id)?;
            let reset = update.apply_to(&mut budget)?;
            if reset {
                budget.period = bounds_for(budget.period_kind, now);
                budget.last_notified_level = None;
                budget.spent = self.compute_spent(&budget)?;
                debug!(budget_id, period = %budget.period, "Budget reset after edit");
            }
            self.budgets.save_budget(&budget)?;
            Ok(budget)
        })
    }

    /// Move a budget into the period containing `now` once its stored period ends
    ///
    /// Returns true when the period rolled.
    pub fn roll_period_if_needed(&self, budget_id: i64, now: DateTime<Utc>) -> Result<bool> {
        self.locks.with_lock(budget_id, || {
            let mut budget = self.budgets.get_budget(budget_id)?;
            if budget.period.contains(now) {
                return Ok(false);
            }

            let previous = budget.period;
            budget.period = bounds_for(budget.period_kind, now);
            budget.last_notified_level = None;
            budget.spent = self.compute_spent(&budget)?;
            self.budgets.save_budget(&budget)?;

            info!(
                budget_id,
                from = %previous,
                to = %budget.period,
                "Rolled budget period"
            );
            Ok(true)
        })
    }

    /// Unused amount carried in from the previous period, for reporting
    ///
    /// Zero unless the budget has rollover enabled. Never touches `spent`.
    pub fn carry_over(&self, budget: &Budget) -> Result<Decimal> {
        if !budget.rollover {
            return Ok(Decimal::ZERO);
        }
        let previous = Budget {
            period: previous_bounds(budget.period_kind, &budget.period),
            ..budget.clone()
        };
        let previous_spent = self.compute_spent(&previous)?;
        Ok(rollover_carry(budget, previous_spent))
    }

    pub fn delete_budget(&self, budget_id: i64) -> Result<()> {
        self.locks
            .with_lock(budget_id, || self.budgets.delete_budget(budget_id))?;
        self.locks.forget(budget_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{NewTransaction, TransactionUpdate};
    use crate::period::PeriodKind;
    use crate::test_utils::{at, budget_services, expense, income, utc};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn setup() -> (Database, Arc<BudgetSpendTracker>) {
        let db = Database::in_memory().unwrap();
        let (tracker, _) = budget_services(&db);
        (db, tracker)
    }

    fn food_budget(tracker: &BudgetSpendTracker, kind: PeriodKind, now: DateTime<Utc>) -> Budget {
        tracker
            .create_budget(NewBudget::new(1, "Food", dec!(400), kind), now)
            .unwrap()
    }

    #[test]
    fn test_contribution_rules() {
        let now = utc(2024, 3, 10);
        let budget = NewBudget::new(1, "Food", dec!(400), PeriodKind::Monthly)
            .into_budget(bounds_for(PeriodKind::Monthly, now), now)
            .unwrap();
        let base = Transaction {
            id: 1,
            owner_id: 1,
            kind: TransactionKind::Expense,
            amount: dec!(25),
            category: "Food".to_string(),
            occurred_at: now,
            excluded: false,
            description: None,
        };

        assert_eq!(contribution(&budget, &base), dec!(25));

        let cases = [
            Transaction { excluded: true, ..base.clone() },
            Transaction { kind: TransactionKind::Income, ..base.clone() },
            Transaction { owner_id: 2, ..base.clone() },
            Transaction { category: "Travel".to_string(), ..base.clone() },
            Transaction { occurred_at: budget.period.end, ..base.clone() },
        ];
        for tx in cases {
            assert_eq!(contribution(&budget, &tx), Decimal::ZERO, "{:?}", tx);
        }
    }

    #[test]
    fn test_create_budget_picks_up_existing_spend() {
        let (db, tracker) = setup();
        let now = at(2024, 3, 20, 12, 0);
        db.insert_transaction(&expense(1, "Food", dec!(120), utc(2024, 3, 2)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(50), utc(2024, 2, 28)))
            .unwrap();

        let budget = food_budget(&tracker, PeriodKind::Monthly, now);
        assert_eq!(budget.spent, dec!(120));
        assert_eq!(db.get_budget(budget.id).unwrap().spent, dec!(120));
    }

    #[test]
    fn test_create_budget_validation() {
        let (_db, tracker) = setup();
        let bad = NewBudget::new(1, "Food", dec!(100), PeriodKind::Monthly)
            .with_thresholds(vec![dec!(90), dec!(70)]);
        assert!(tracker.create_budget(bad, Utc::now()).unwrap_err().is_validation());
    }

    #[test]
    fn test_incremental_create_and_delete() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);

        let tx = db
            .insert_transaction(&expense(1, "Food", dec!(320), utc(2024, 3, 6)))
            .unwrap();
        assert_eq!(tracker.on_transaction_created(&tx).unwrap(), vec![budget.id]);
        assert_eq!(db.get_budget(budget.id).unwrap().spent, dec!(320));

        db.delete_transaction(tx.id).unwrap();
        assert_eq!(tracker.on_transaction_deleted(&tx).unwrap(), vec![budget.id]);
        assert_eq!(db.get_budget(budget.id).unwrap().spent, Decimal::ZERO);
    }

    #[test]
    fn test_unrelated_transactions_change_nothing() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);

        let other_category = db
            .insert_transaction(&expense(1, "Travel", dec!(90), now))
            .unwrap();
        let paycheck = db.insert_transaction(&income(1, dec!(900), now)).unwrap();
        let out_of_period = db
            .insert_transaction(&expense(1, "Food", dec!(10), utc(2024, 4, 2)))
            .unwrap();

        for tx in [other_category, paycheck, out_of_period] {
            assert!(tracker.on_transaction_created(&tx).unwrap().is_empty());
        }
        assert_eq!(db.get_budget(budget.id).unwrap().spent, Decimal::ZERO);
    }

    #[test]
    fn test_update_moves_spend_between_categories() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let food = food_budget(&tracker, PeriodKind::Monthly, now);
        let travel = tracker
            .create_budget(NewBudget::new(1, "Travel", dec!(200), PeriodKind::Monthly), now)
            .unwrap();

        let old = db
            .insert_transaction(&expense(1, "Food", dec!(40), now))
            .unwrap();
        tracker.on_transaction_created(&old).unwrap();

        let new = TransactionUpdate {
            category: Some("Travel".to_string()),
            amount: Some(dec!(45)),
            ..Default::default()
        }
        .apply_to(&old)
        .unwrap();
        db.update_transaction(&new).unwrap();

        let mut changed = tracker.on_transaction_updated(&old, &new).unwrap();
        changed.sort();
        assert_eq!(changed, vec![food.id, travel.id]);
        assert_eq!(db.get_budget(food.id).unwrap().spent, Decimal::ZERO);
        assert_eq!(db.get_budget(travel.id).unwrap().spent, dec!(45));
    }

    #[test]
    fn test_update_moving_date_out_of_period() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);

        let old = db
            .insert_transaction(&expense(1, "Food", dec!(60), now))
            .unwrap();
        tracker.on_transaction_created(&old).unwrap();

        let new = Transaction {
            occurred_at: utc(2024, 2, 20),
            ..old.clone()
        };
        db.update_transaction(&new).unwrap();
        tracker.on_transaction_updated(&old, &new).unwrap();
        assert_eq!(db.get_budget(budget.id).unwrap().spent, Decimal::ZERO);
    }

    #[test]
    fn test_excluding_a_transaction_removes_it() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);

        let old = db
            .insert_transaction(&expense(1, "Food", dec!(75), now))
            .unwrap();
        tracker.on_transaction_created(&old).unwrap();

        let new = Transaction {
            excluded: true,
            ..old.clone()
        };
        db.update_transaction(&new).unwrap();
        tracker.on_transaction_updated(&old, &new).unwrap();
        assert_eq!(db.get_budget(budget.id).unwrap().spent, Decimal::ZERO);
        assert_eq!(tracker.resync(budget.id).unwrap().spent, Decimal::ZERO);
    }

    #[test]
    fn test_fan_out_to_overlapping_budgets() {
        let (db, tracker) = setup();
        // Wednesday; the week lies inside March
        let now = utc(2024, 3, 13);
        let monthly = food_budget(&tracker, PeriodKind::Monthly, now);
        let weekly = food_budget(&tracker, PeriodKind::Weekly, now);

        let in_week = db
            .insert_transaction(&expense(1, "Food", dec!(30), utc(2024, 3, 12)))
            .unwrap();
        let earlier_in_month = db
            .insert_transaction(&expense(1, "Food", dec!(20), utc(2024, 3, 2)))
            .unwrap();
        tracker.on_transaction_created(&in_week).unwrap();
        tracker.on_transaction_created(&earlier_in_month).unwrap();

        assert_eq!(db.get_budget(monthly.id).unwrap().spent, dec!(50));
        assert_eq!(db.get_budget(weekly.id).unwrap().spent, dec!(30));

        // Incremental state matches the authoritative recompute
        assert_eq!(tracker.resync(monthly.id).unwrap().spent, dec!(50));
        assert_eq!(tracker.resync(weekly.id).unwrap().spent, dec!(30));
    }

    #[test]
    fn test_resync_is_idempotent_and_repairs_drift() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);
        db.insert_transaction(&expense(1, "Food", dec!(19.99), now))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(0.01), now))
            .unwrap();

        // Corrupt the stored value
        db.set_spent(budget.id, dec!(999)).unwrap();

        let first = tracker.resync(budget.id).unwrap();
        let second = tracker.resync(budget.id).unwrap();
        assert_eq!(first.spent, dec!(20));
        assert_eq!(first, second);
    }

    #[test]
    fn test_drift_clamps_at_zero() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);

        // Delete event for a transaction the budget never counted
        let tx = db
            .insert_transaction(&expense(1, "Food", dec!(50), now))
            .unwrap();
        tracker.on_transaction_deleted(&tx).unwrap();
        assert_eq!(db.get_budget(budget.id).unwrap().spent, Decimal::ZERO);
    }

    enum Step {
        Create,
        Update(TransactionUpdate),
        Delete,
    }

    /// Per-transaction event histories; only the interleaving varies
    fn lifecycles(now: DateTime<Utc>) -> Vec<(NewTransaction, Vec<Step>)> {
        let later = now + Duration::hours(1);
        vec![
            (
                expense(1, "Food", dec!(10.10), later),
                vec![
                    Step::Create,
                    Step::Update(TransactionUpdate {
                        category: Some("Travel".to_string()),
                        ..Default::default()
                    }),
                    Step::Update(TransactionUpdate {
                        category: Some("Food".to_string()),
                        ..Default::default()
                    }),
                ],
            ),
            (
                expense(1, "Food", dec!(20.20), later),
                vec![
                    Step::Create,
                    Step::Update(TransactionUpdate {
                        occurred_at: Some(utc(2024, 2, 20)),
                        ..Default::default()
                    }),
                    Step::Delete,
                ],
            ),
            (
                expense(1, "Food", dec!(30.30), later),
                vec![
                    Step::Create,
                    Step::Update(TransactionUpdate {
                        amount: Some(dec!(35.35)),
                        ..Default::default()
                    }),
                ],
            ),
            (
                expense(1, "Travel", dec!(40.40), later),
                vec![
                    Step::Create,
                    Step::Update(TransactionUpdate {
                        category: Some("Food".to_string()),
                        ..Default::default()
                    }),
                    Step::Update(TransactionUpdate {
                        excluded: Some(true),
                        ..Default::default()
                    }),
                    Step::Update(TransactionUpdate {
                        excluded: Some(false),
                        ..Default::default()
                    }),
                ],
            ),
        ]
    }

    #[test]
    fn test_incremental_order_independent() {
        let now = utc(2024, 3, 5);
        // Each index advances that transaction's history by one step
        let schedules: [[usize; 12]; 4] = [
            [0, 0, 0, 1, 1, 1, 2, 2, 3, 3, 3, 3],
            [3, 3, 3, 3, 2, 2, 1, 1, 1, 0, 0, 0],
            [0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 3, 3],
            [3, 1, 0, 2, 3, 2, 1, 0, 3, 0, 1, 3],
        ];

        for schedule in schedules {
            let (db, tracker) = setup();
            let food = food_budget(&tracker, PeriodKind::Monthly, now);
            let travel = tracker
                .create_budget(NewBudget::new(1, "Travel", dec!(200), PeriodKind::Monthly), now)
                .unwrap();

            let mut histories: Vec<_> = lifecycles(now)
                .into_iter()
                .map(|(seed, steps)| (seed, steps.into_iter()))
                .collect();
            let mut current: Vec<Option<Transaction>> = vec![None; histories.len()];

            for i in schedule {
                let (seed, steps) = &mut histories[i];
                match steps.next().unwrap() {
                    Step::Create => {
                        let tx = db.insert_transaction(seed).unwrap();
                        tracker.on_transaction_created(&tx).unwrap();
                        current[i] = Some(tx);
                    }
                    Step::Update(update) => {
                        let old = current[i].take().unwrap();
                        let new = update.apply_to(&old).unwrap();
                        db.update_transaction(&new).unwrap();
                        tracker.on_transaction_updated(&old, &new).unwrap();
                        current[i] = Some(new);
                    }
                    Step::Delete => {
                        let old = current[i].take().unwrap();
                        db.delete_transaction(old.id).unwrap();
                        tracker.on_transaction_deleted(&old).unwrap();
                    }
                }
            }
            assert!(histories.iter_mut().all(|(_, steps)| steps.next().is_none()));

            let food_spent = db.get_budget(food.id).unwrap().spent;
            let travel_spent = db.get_budget(travel.id).unwrap().spent;
            assert_eq!(food_spent, dec!(85.85), "schedule {:?}", schedule);
            assert_eq!(travel_spent, Decimal::ZERO, "schedule {:?}", schedule);
            assert_eq!(tracker.resync(food.id).unwrap().spent, food_spent);
            assert_eq!(tracker.resync(travel.id).unwrap().spent, travel_spent);
        }
    }

    #[test]
    fn test_update_budget_limit_keeps_state() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 5);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);
        db.insert_transaction(&expense(1, "Food", dec!(100), now))
            .unwrap();
        tracker.resync(budget.id).unwrap();
        db.set_last_notified(budget.id, Some(crate::models::AlertLevel::Warning))
            .unwrap();

        let updated = tracker
            .update_budget(
                budget.id,
                BudgetUpdate {
                    limit: Some(dec!(120)),
                    ..Default::default()
                },
                utc(2024, 3, 7),
            )
            .unwrap();
        assert_eq!(updated.spent, dec!(100));
        assert_eq!(updated.limit, dec!(120));
        assert_eq!(
            updated.last_notified_level,
            Some(crate::models::AlertLevel::Warning)
        );
    }

    #[test]
    fn test_update_budget_period_change_resets() {
        let (db, tracker) = setup();
        let now = utc(2024, 3, 13);
        let budget = food_budget(&tracker, PeriodKind::Monthly, now);
        db.insert_transaction(&expense(1, "Food", dec!(100), utc(2024, 3, 2)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(15), utc(2024, 3, 12)))
            .unwrap();
        tracker.resync(budget.id).unwrap();
        db.set_last_notified(budget.id, Some(crate::models::AlertLevel::Critical))
            .unwrap();

        let updated = tracker
            .update_budget(
                budget.id,
                BudgetUpdate {
                    period_kind: Some(PeriodKind::Weekly),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        assert_eq!(updated.period, bounds_for(PeriodKind::Weekly, now));
        assert_eq!(updated.spent, dec!(15));
        assert!(updated.last_notified_level.is_none());
        assert_eq!(db.get_budget(budget.id).unwrap(), updated);
    }

    #[test]
    fn test_roll_period() {
        let (db, tracker) = setup();
        let budget = food_budget(&tracker, PeriodKind::Monthly, utc(2024, 3, 5));
        db.insert_transaction(&expense(1, "Food", dec!(300), utc(2024, 3, 6)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(25), utc(2024, 4, 1)))
            .unwrap();
        tracker.resync(budget.id).unwrap();
        db.set_last_notified(budget.id, Some(crate::models::AlertLevel::Warning))
            .unwrap();

        assert!(!tracker.roll_period_if_needed(budget.id, utc(2024, 3, 31)).unwrap());
        assert!(tracker.roll_period_if_needed(budget.id, utc(2024, 4, 2)).unwrap());

        let rolled = db.get_budget(budget.id).unwrap();
        assert_eq!(rolled.period.start, utc(2024, 4, 1));
        assert_eq!(rolled.spent, dec!(25));
        assert!(rolled.last_notified_level.is_none());
    }

    #[test]
    fn test_delete_budget() {
        let (db, tracker) = setup();
        let budget = food_budget(&tracker, PeriodKind::Monthly, utc(2024, 3, 5));
        tracker.delete_budget(budget.id).unwrap();
        assert!(db.list_budgets().unwrap().is_empty());
    }

    #[test]
    fn test_carry_over_only_with_rollover() {
        let (db, tracker) = setup();
        db.insert_transaction(&expense(1, "Food", dec!(150), utc(2024, 2, 20)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(50), utc(2024, 3, 2)))
            .unwrap();

        let mut budget = food_budget(&tracker, PeriodKind::Monthly, utc(2024, 3, 5));
        assert_eq!(tracker.carry_over(&budget).unwrap(), Decimal::ZERO);

        budget.rollover = true;
        assert_eq!(tracker.carry_over(&budget).unwrap(), dec!(250));
        // Reporting only
        assert_eq!(budget.spent, dec!(50));
    }
}
