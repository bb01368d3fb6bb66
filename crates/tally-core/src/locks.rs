//! Per-budget serialization
//!
//! Incremental updates, resyncs and alert evaluation of the same budget must
//! not interleave. Different budgets proceed in parallel.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

/// Registry of one mutex per budget id
#[derive(Debug, Default)]
pub struct BudgetLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl BudgetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared mutex for `budget_id`, created on first use
    pub fn handle(&self, budget_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(budget_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the budget's lock
    ///
    /// Never call this re-entrantly for the same id.
    pub fn with_lock<T>(&self, budget_id: i64, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(budget_id);
        // The guarded value is (), so a poisoned lock carries no broken state
        let _guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Drop the entry of a deleted budget
    pub fn forget(&self, budget_id: i64) {
        self.locks.remove(&budget_id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
