use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::debug;

use surge_core::CheckSet;

use crate::aggregator::ResultAggregator;
use crate::executor::RequestExecutor;

/// Pool of virtual-user tasks reconciled against the schedule's target.
///
/// Each virtual user owns its loop exclusively; the aggregator is the only
/// state shared across users. Stopping is cooperative: a signaled user
/// finishes its in-flight request/check/record cycle before exiting.
pub struct VirtualUserPool {
    executor: Arc<dyn RequestExecutor>,
    checks: CheckSet,
    aggregator: Arc<ResultAggregator>,
    think_time: Duration,
    next_id: u64,
    active: Vec<UserHandle>,
    drained: Vec<JoinHandle<()>>,
}

struct UserHandle {
    id: u64,
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl VirtualUserPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        checks: CheckSet,
        aggregator: Arc<ResultAggregator>,
        think_time: Duration,
    ) -> Self {
        Self {
            executor,
            checks,
            aggregator,
            think_time,
            next_id: 0,
            active: Vec::new(),
            drained: Vec::new(),
        }
    }

    /// Number of users currently counted toward the schedule target.
    ///
    /// A user signaled to stop is no longer counted, even while it finishes
    /// its in-flight cycle.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Grows or gracefully shrinks the pool to `target` users.
    ///
    /// Excess users are signaled to stop after their current cycle, never
    /// aborted mid-request. Immediately after this returns, `active_count`
    /// equals `target`.
    pub fn reconcile(&mut self, target: u32) {
        let target = target as usize;
        while self.active.len() < target {
            self.spawn_user();
        }
        while self.active.len() > target {
            // Newest users stop first.
            if let Some(user) = self.active.pop() {
                user.stop.store(true, Ordering::Relaxed);
                debug!(user_id = user.id, "signaled virtual user to stop");
                self.drained.push(user.task);
            }
        }
    }

    fn spawn_user(&mut self) {
        let id = self.next_id;
        self.next_id += 1;
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(user_loop(
            id,
            Arc::clone(&self.executor),
            self.checks.clone(),
            Arc::clone(&self.aggregator),
            self.think_time,
            Arc::clone(&stop),
        ));
        debug!(user_id = id, "spawned virtual user");
        self.active.push(UserHandle { id, stop, task });
    }

    /// Signals every user to stop and waits for all loops to exit,
    /// including users drained by earlier reconciliations.
    pub async fn stop_all(&mut self) {
        for user in &self.active {
            user.stop.store(true, Ordering::Relaxed);
        }
        let mut tasks: Vec<JoinHandle<()>> = self.drained.drain(..).collect();
        tasks.extend(self.active.drain(..).map(|user| user.task));
        debug!(count = tasks.len(), "waiting for virtual users to exit");
        join_all(tasks).await;
    }
}

/// One virtual user's request loop: execute, evaluate checks, record,
/// think-time sleep, repeat until the stop flag is observed.
async fn user_loop(
    id: u64,
    executor: Arc<dyn RequestExecutor>,
    checks: CheckSet,
    aggregator: Arc<ResultAggregator>,
    think_time: Duration,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let result = executor.execute().await;
        let outcomes = checks.evaluate(&result);
        aggregator.record(&result, &outcomes);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        tokio::time::sleep(think_time).await;
    }
    debug!(user_id = id, "virtual user exited");
}
