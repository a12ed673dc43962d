//! Sleep-timer polling.
//!
//! Sleep timers live on group coordinators. The engine samples every
//! coordinator once at warm-up, then re-polls only the coordinators that
//! currently hold a timer on the coarse scheduler tick, and on demand when
//! a transport notification announces a generation change. Emitted values
//! are `h:mm:ss` display strings, `None` once the timer is gone.

use std::sync::Arc;

use crate::events::{EventRegistry, ZoneValue};
use crate::state::FleetState;
use crate::utils::format_hms;
use crate::zone::transport::ZoneTransport;
use crate::zone::types::ZoneId;

/// Polls coordinator sleep timers and emits their display values.
pub struct SleepTimerService {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    transport: Arc<dyn ZoneTransport>,
}

impl SleepTimerService {
    /// Creates a new SleepTimerService.
    pub fn new(
        state: Arc<FleetState>,
        events: Arc<EventRegistry>,
        transport: Arc<dyn ZoneTransport>,
    ) -> Self {
        Self {
            state,
            events,
            transport,
        }
    }

    /// Current coordinators, deduplicated, in zone order.
    fn coordinators(&self) -> Vec<ZoneId> {
        let mut coordinators = Vec::new();
        for zone in 0..self.state.zone_count() {
            let coordinator = self.state.coordinator_of(zone);
            if !coordinators.contains(&coordinator) {
                coordinators.push(coordinator);
            }
        }
        coordinators
    }

    /// Warm-up sample: polls every coordinator and emits its timer value,
    /// present or not.
    pub async fn sample_all(&self) {
        for coordinator in self.coordinators() {
            self.poll_coordinator(coordinator, true).await;
        }
    }

    /// Coarse-interval poll: re-polls only the coordinators that currently
    /// hold a non-absent timer, emitting the ticking remaining time.
    pub async fn poll_active(&self) {
        for coordinator in self.coordinators() {
            let active = self
                .state
                .record(coordinator)
                .lock()
                .sleep_timer_secs
                .is_some();
            if active {
                self.poll_coordinator(coordinator, true).await;
            }
        }
    }

    /// On-demand re-poll after a sleep-timer-generation notification;
    /// emits only when the stored value actually changed.
    pub async fn refresh_zone(&self, zone: ZoneId) {
        let coordinator = self.state.coordinator_of(zone);
        self.poll_coordinator(coordinator, false).await;
    }

    async fn poll_coordinator(&self, coordinator: ZoneId, force_emit: bool) {
        let Some(node) = self.state.primary_node(coordinator) else {
            return;
        };
        let remaining = match self.transport.get_sleep_timer(&node).await {
            Ok(remaining) => remaining,
            Err(err) => {
                log::debug!(
                    "[SleepTimer] Query failed for coordinator {}: {}",
                    coordinator,
                    err
                );
                return;
            }
        };

        let changed = {
            let mut record = self.state.record(coordinator).lock();
            if record.sleep_timer_secs != remaining {
                record.sleep_timer_secs = remaining;
                true
            } else {
                false
            }
        };

        if changed || force_emit {
            self.events
                .sleep_timer_changed
                .emit(&ZoneValue::new(coordinator, remaining.map(format_hms)));
        }
    }
}
