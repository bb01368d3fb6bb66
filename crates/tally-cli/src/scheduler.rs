//! Background scheduler for the periodic work units
//!
//! Each registered unit runs in its own tokio task on its own interval. A
//! failing run is logged and the unit keeps its cadence; other units are
//! unaffected. Cancelling the token stops every loop after its current run.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type UnitFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;
type UnitFn = Arc<dyn Fn(CancellationToken) -> UnitFuture + Send + Sync>;

struct WorkUnit {
    name: &'static str,
    every: Duration,
    run_at_start: bool,
    run: UnitFn,
}

/// Named, independently failing work units with their own cadence
#[derive(Default)]
pub struct Scheduler {
    units: Vec<WorkUnit>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit; `run` returns a one-line summary of what it did
    pub fn register<F, Fut>(
        &mut self,
        name: &'static str,
        every: Duration,
        run_at_start: bool,
        run: F,
    ) where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.units.push(WorkUnit {
            name,
            every,
            run_at_start,
            run: Arc::new(move |cancel: CancellationToken| Box::pin(run(cancel)) as UnitFuture),
        });
    }

    pub fn unit_names(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.name).collect()
    }

    /// Spawn every unit; the returned set finishes once `cancel` fires
    pub fn start(self, cancel: CancellationToken) -> JoinSet<()> {
        let mut tasks = JoinSet::new();

        for unit in self.units {
            info!(
                unit = unit.name,
                every_secs = unit.every.as_secs(),
                "Starting scheduled unit"
            );
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let mut ticker = interval(unit.every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                // The first tick completes immediately
                if !unit.run_at_start {
                    ticker.tick().await;
                }

                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                    }

                    match (unit.run)(cancel.clone()).await {
                        Ok(summary) => info!(unit = unit.name, "{}", summary),
                        Err(e) => error!(unit = unit.name, "Scheduled unit failed: {:#}", e),
                    }
                }
                info!(unit = unit.name, "Scheduled unit stopped");
            });
        }

        tasks
    }
}
