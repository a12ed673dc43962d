//! The multi-rate cyclic scheduler.
//!
//! Three self-rescheduling repeating tasks, none overlapping itself: a
//! task's next run only happens after the current run completes, because
//! each loop awaits its tick body inline.
//!
//! - **Primary** (~100 ms): first tick is the warm-up window (one-time aux
//!   discovery, forced volume/balance sample, initial sleep-timer sample);
//!   every later tick drains queued notifications and refreshes topology.
//! - **Secondary** (~100 ms): pull-refreshes every dirty version counter.
//! - **Sleep timer** (~1000 ms): re-polls coordinators holding a timer.
//!
//! The scheduler runs until the engine's cancellation token fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};
use crate::runtime::TaskSpawner;
use crate::state::Config;

use super::library::LibraryService;
use super::line_in::LineInService;
use super::sleep_timer::SleepTimerService;
use super::subscriptions::NotificationProcessor;
use super::topology::TopologyManager;
use super::volume::VolumeService;

/// Drives the engine's periodic work.
pub struct CyclicScheduler {
    config: Config,
    topology: Arc<TopologyManager>,
    processor: Arc<NotificationProcessor>,
    library: Arc<LibraryService>,
    volume: Arc<VolumeService>,
    sleep: Arc<SleepTimerService>,
    line_in: Arc<LineInService>,
    cancel: CancellationToken,
    started: AtomicBool,
    warmed_up: AtomicBool,
}

impl CyclicScheduler {
    /// Creates a scheduler over the engine's services.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        topology: Arc<TopologyManager>,
        processor: Arc<NotificationProcessor>,
        library: Arc<LibraryService>,
        volume: Arc<VolumeService>,
        sleep: Arc<SleepTimerService>,
        line_in: Arc<LineInService>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            topology,
            processor,
            library,
            volume,
            sleep,
            line_in,
            cancel,
            started: AtomicBool::new(false),
            warmed_up: AtomicBool::new(false),
        }
    }

    /// The cancellation token stopping all three loops.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawns the three repeating tasks. Fails if called twice.
    pub fn start<S: TaskSpawner>(self: &Arc<Self>, spawner: &S) -> EngineResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        log::info!(
            "[Scheduler] Starting (primary {}ms, secondary {}ms, sleep {}ms)",
            self.config.primary_period_ms,
            self.config.secondary_period_ms,
            self.config.sleep_timer_period_ms
        );

        let primary = Arc::clone(self);
        let primary_period = self.config.primary_period_ms;
        spawner.spawn(async move {
            primary
                .run_loop(primary_period, |scheduler| async move {
                    scheduler.run_primary_tick().await;
                })
                .await;
        });

        let secondary = Arc::clone(self);
        let secondary_period = self.config.secondary_period_ms;
        spawner.spawn(async move {
            secondary
                .run_loop(secondary_period, |scheduler| async move {
                    scheduler.run_secondary_tick().await;
                })
                .await;
        });

        let sleep = Arc::clone(self);
        let sleep_period = self.config.sleep_timer_period_ms;
        spawner.spawn(async move {
            sleep
                .run_loop(sleep_period, |scheduler| async move {
                    scheduler.run_sleep_tick().await;
                })
                .await;
        });

        Ok(())
    }

    async fn run_loop<F, Fut>(self: Arc<Self>, period_ms: u64, tick: F)
    where
        F: Fn(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(Duration::from_millis(period_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    log::debug!("[Scheduler] Loop ({}ms) stopped", period_ms);
                    break;
                }
                _ = interval.tick() => tick(Arc::clone(&self)).await,
            }
        }
    }

    /// One primary tick: warm-up work on the first run, then notification
    /// draining plus a topology refresh on every later run.
    pub async fn run_primary_tick(&self) {
        if !self.warmed_up.swap(true, Ordering::SeqCst) {
            log::info!("[Scheduler] Warm-up: aux discovery and initial samples");
            self.line_in.discover_all().await;
            self.volume.sample_volumes(true).await;
            self.volume.sample_balances(true).await;
            self.sleep.sample_all().await;
            return;
        }

        self.processor.poll_all().await;
        self.topology.refresh_topology().await;
    }

    /// One secondary tick: refetch everything whose counter is dirty.
    pub async fn run_secondary_tick(&self) {
        self.library.run_dirty_refreshes().await;
    }

    /// One sleep-timer tick.
    pub async fn run_sleep_tick(&self) {
        self.sleep.poll_active().await;
    }
}
