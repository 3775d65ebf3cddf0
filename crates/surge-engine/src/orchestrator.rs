use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use surge_core::{CheckSet, EngineError, EngineResult, RateSchedule, RunConfig, RunSummary};

use crate::aggregator::ResultAggregator;
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::pool::VirtualUserPool;

/// Lifecycle states of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Schedule validated, nothing spawned yet.
    Idle,
    /// Reconciliation ticks are driving the pool.
    Running,
    /// Users are being stopped; in-flight cycles complete.
    Draining,
    /// Terminal; the final summary has been taken.
    Done,
}

impl RunState {
    /// Returns the lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

/// Cloneable handle that moves a running orchestrator into `Draining`.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Requests a graceful stop. In-flight requests complete; the run still
    /// produces a final summary.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Drives a whole run: reads the schedule each tick, reconciles the pool,
/// and drains once the schedule completes or a stop is requested.
pub struct Orchestrator {
    schedule: RateSchedule,
    pool: VirtualUserPool,
    aggregator: Arc<ResultAggregator>,
    tick_interval: Duration,
    state: RunState,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("schedule", &self.schedule)
            .field("tick_interval", &self.tick_interval)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Builds an orchestrator from a run configuration.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidSchedule` before any virtual user is spawned when
    /// the configuration is malformed.
    pub fn from_config(config: &RunConfig, checks: CheckSet) -> EngineResult<Self> {
        let schedule = config.schedule()?;
        let executor: Arc<dyn RequestExecutor> = Arc::new(HttpExecutor::new(
            &config.target_url,
            config.method,
            config.request_timeout(),
        )?);
        Ok(Self::new(
            schedule,
            executor,
            checks,
            config.think_time(),
            config.tick_interval(),
        ))
    }

    /// Assembles an orchestrator from parts.
    ///
    /// Used by embedders and tests that supply their own executor.
    #[must_use]
    pub fn new(
        schedule: RateSchedule,
        executor: Arc<dyn RequestExecutor>,
        checks: CheckSet,
        think_time: Duration,
        tick_interval: Duration,
    ) -> Self {
        let aggregator = Arc::new(ResultAggregator::new());
        let pool = VirtualUserPool::new(executor, checks, Arc::clone(&aggregator), think_time);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            schedule,
            pool,
            aggregator,
            tick_interval,
            state: RunState::Idle,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// The schedule driving this run.
    #[must_use]
    pub const fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    /// Handle for requesting a graceful stop from another task.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Drives the run to completion and returns the final summary.
    ///
    /// Ticks are strictly sequential; a tick that runs long delays the next
    /// one rather than overlapping it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when called on an orchestrator that already ran.
    pub async fn run(&mut self) -> EngineResult<RunSummary> {
        if self.state != RunState::Idle {
            return Err(EngineError::invalid_state(format!(
                "run() called in state `{}`",
                self.state.as_str()
            )));
        }
        self.state = RunState::Running;
        info!(
            run_id = %self.aggregator.run_id(),
            total_secs = self.schedule.total_duration().as_secs_f64(),
            stages = self.schedule.stages().len(),
            "run started"
        );

        let started = Instant::now();
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop_rx = self.stop_rx.clone();

        // A stop requested before the first tick skips straight to draining.
        while !*stop_rx.borrow_and_update() {
            tokio::select! {
                _ = ticker.tick() => {
                    let elapsed = started.elapsed();
                    if self.schedule.is_complete(elapsed) {
                        info!("schedule complete, draining");
                        break;
                    }
                    let target = self.schedule.concurrency_at(elapsed);
                    if target as usize != self.pool.active_count() {
                        debug!(
                            elapsed_secs = elapsed.as_secs_f64(),
                            target,
                            active = self.pool.active_count(),
                            "reconciling pool"
                        );
                    }
                    self.pool.reconcile(target);
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("stop requested, draining");
                        break;
                    }
                }
            }
        }

        self.state = RunState::Draining;
        self.pool.stop_all().await;
        self.state = RunState::Done;

        let summary = self.aggregator.snapshot();
        info!(
            run_id = %summary.run_id,
            total_requests = summary.total_requests,
            total_errors = summary.total_errors,
            "run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use surge_core::{Check, RequestResult, Stage};

    struct InstantOk;

    #[async_trait]
    impl RequestExecutor for InstantOk {
        async fn execute(&self) -> RequestResult {
            RequestResult::ok(200, Duration::from_micros(100))
        }
    }

    fn orchestrator_for(stages: Vec<Stage>) -> Orchestrator {
        Orchestrator::new(
            RateSchedule::new(stages).unwrap(),
            Arc::new(InstantOk),
            CheckSet::new().with(Check::status_is(200)),
            Duration::from_millis(5),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn test_run_transitions_to_done() {
        let mut orchestrator = orchestrator_for(vec![
            Stage::new(Duration::from_millis(100), 3),
            Stage::new(Duration::from_millis(100), 0),
        ]);
        assert_eq!(orchestrator.state(), RunState::Idle);

        let summary = orchestrator.run().await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Done);
        assert!(summary.total_requests > 0);
        assert_eq!(summary.total_errors, 0);
    }

    #[tokio::test]
    async fn test_run_twice_is_invalid_state() {
        let mut orchestrator =
            orchestrator_for(vec![Stage::new(Duration::from_millis(50), 1)]);
        orchestrator.run().await.unwrap();

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_stop_handle_drains_early() {
        // A minute-long schedule that the stop handle cuts short.
        let mut orchestrator = orchestrator_for(vec![Stage::new(Duration::from_secs(60), 2)]);
        let stop = orchestrator.stop_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            stop.stop();
        });

        let started = Instant::now();
        let summary = orchestrator.run().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(orchestrator.state(), RunState::Done);
        assert!(summary.total_requests > 0);
    }
}
