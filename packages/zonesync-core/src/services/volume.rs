//! Volume and balance sampling and control.
//!
//! Volume is a zone-level attribute read from the primary node; balance is
//! derived from the per-channel (LF/RF) volumes as `right - left`. Both are
//! cached per zone and diffed on every sample, so rendering-control
//! notifications translate into at most one event per actual change.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::{EngineError, EngineResult};
use crate::events::{EventRegistry, ZoneValue};
use crate::state::FleetState;
use crate::zone::record::{BALANCE_UNAVAILABLE, VOLUME_UNAVAILABLE};
use crate::zone::transport::{AudioChannel, ZoneTransport};
use crate::zone::types::ZoneId;

/// Volume command actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    /// Set an absolute level (0-100).
    Absolute(u8),
    /// Raise by a step.
    Up(u8),
    /// Lower by a step.
    Down(u8),
    /// Write the same level to every available zone.
    EqualizeAll(u8),
}

/// Balance command actions. The louder side pins to 100 and the other side
/// moves by the step; center resets both channels to full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAction {
    Left,
    Right,
    Center,
}

/// Samples and commands zone volume and balance.
pub struct VolumeService {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    transport: Arc<dyn ZoneTransport>,
}

impl VolumeService {
    /// Creates a new VolumeService.
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

    fn require_node(&self, zone: ZoneId) -> EngineResult<String> {
        if zone >= self.state.zone_count() {
            return Err(EngineError::UnknownZone(zone));
        }
        self.state
            .primary_node(zone)
            .ok_or(EngineError::ZoneUnavailable(zone))
    }

    /// Samples every zone's volume, emitting volume-changed for each zone
    /// whose cached value differs (or unconditionally with `force`).
    pub async fn sample_volumes(&self, force: bool) {
        for zone in 0..self.state.zone_count() {
            let current = match self.state.primary_node(zone) {
                Some(node) => match self.transport.get_volume(&node).await {
                    Ok(volume) => i32::from(volume),
                    Err(err) => {
                        log::debug!("[Volume] Volume query failed for zone {}: {}", zone, err);
                        VOLUME_UNAVAILABLE
                    }
                },
                None => VOLUME_UNAVAILABLE,
            };

            let changed = {
                let mut record = self.state.record(zone).lock();
                if record.volume != current {
                    record.volume = current;
                    true
                } else {
                    false
                }
            };
            if changed || force {
                self.events.volume_changed.emit(&ZoneValue::new(zone, current));
            }
        }
    }

    /// Samples every zone's balance, emitting balance-changed on change (or
    /// unconditionally with `force`).
    pub async fn sample_balances(&self, force: bool) {
        for zone in 0..self.state.zone_count() {
            let current = match self.state.primary_node(zone) {
                Some(node) => match self.read_balance(&node).await {
                    Some(balance) => balance,
                    None => BALANCE_UNAVAILABLE,
                },
                None => BALANCE_UNAVAILABLE,
            };

            let changed = {
                let mut record = self.state.record(zone).lock();
                if record.balance != current {
                    record.balance = current;
                    true
                } else {
                    false
                }
            };
            if changed || force {
                self.events
                    .balance_changed
                    .emit(&ZoneValue::new(zone, current));
            }
        }
    }

    async fn read_balance(&self, node: &str) -> Option<i32> {
        let left = self
            .transport
            .get_channel_volume(node, AudioChannel::LeftFront)
            .await
            .ok()?;
        let right = self
            .transport
            .get_channel_volume(node, AudioChannel::RightFront)
            .await
            .ok()?;
        Some(i32::from(right) - i32::from(left))
    }

    /// Executes a volume command.
    ///
    /// Equalize-all writes to every available zone; a zone that refuses is
    /// logged and skipped so one failure never blocks the rest of the fleet.
    pub async fn set_volume(&self, zone: ZoneId, action: VolumeAction) -> EngineResult<()> {
        match action {
            VolumeAction::EqualizeAll(level) => {
                let level = level.min(100);
                let writes: Vec<_> = (0..self.state.zone_count())
                    .filter_map(|target| {
                        self.state.primary_node(target).map(|node| async move {
                            if let Err(err) = self.transport.set_volume(&node, level).await {
                                log::warn!("[Volume] Equalize failed for zone {}: {}", target, err);
                            }
                        })
                    })
                    .collect();
                join_all(writes).await;
                Ok(())
            }
            VolumeAction::Absolute(level) => {
                let node = self.require_node(zone)?;
                self.transport.set_volume(&node, level.min(100)).await?;
                Ok(())
            }
            VolumeAction::Up(step) => self.step_volume(zone, i32::from(step)).await,
            VolumeAction::Down(step) => self.step_volume(zone, -i32::from(step)).await,
        }
    }

    async fn step_volume(&self, zone: ZoneId, delta: i32) -> EngineResult<()> {
        let node = self.require_node(zone)?;
        let current = i32::from(self.transport.get_volume(&node).await?);
        let target = (current + delta).clamp(0, 100) as u8;
        self.transport.set_volume(&node, target).await?;
        Ok(())
    }

    /// Executes a balance command with the given step.
    pub async fn set_balance(
        &self,
        zone: ZoneId,
        action: BalanceAction,
        step: u8,
    ) -> EngineResult<()> {
        let node = self.require_node(zone)?;
        let step = i32::from(step);

        let mut left = i32::from(
            self.transport
                .get_channel_volume(&node, AudioChannel::LeftFront)
                .await?,
        );
        let mut right = i32::from(
            self.transport
                .get_channel_volume(&node, AudioChannel::RightFront)
                .await?,
        );

        match action {
            BalanceAction::Left => {
                if left >= right {
                    left = 100;
                    right -= step;
                } else {
                    right = 100;
                    left += step;
                }
            }
            BalanceAction::Right => {
                if left <= right {
                    right = 100;
                    left -= step;
                } else {
                    left = 100;
                    right += step;
                }
            }
            BalanceAction::Center => {
                left = 100;
                right = 100;
            }
        }

        let left = left.clamp(0, 100) as u8;
        let right = right.clamp(0, 100) as u8;
        self.transport
            .set_channel_volume(&node, AudioChannel::LeftFront, left)
            .await?;
        self.transport
            .set_channel_volume(&node, AudioChannel::RightFront, right)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::zone::test_fixtures::MockTransport;
    use crate::zone::types::ZoneConfig;

    struct Rig {
        state: Arc<FleetState>,
        events: Arc<EventRegistry>,
        transport: Arc<MockTransport>,
        volume: VolumeService,
    }

    fn rig() -> Rig {
        let transport = Arc::new(MockTransport::new());
        transport.add_node("10.0.0.2", "Kitchen");
        transport.add_node("10.0.0.3", "Office");

        let state = Arc::new(FleetState::new(&[
            ZoneConfig::single("10.0.0.2"),
            ZoneConfig::single("10.0.0.3"),
        ]));
        state.set_available(0, true);
        state.set_available(1, true);

        let events = Arc::new(EventRegistry::new());
        let volume = VolumeService::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport) as Arc<dyn ZoneTransport>,
        );
        Rig {
            state,
            events,
            transport,
            volume,
        }
    }

    fn collect_volumes(events: &EventRegistry) -> Arc<Mutex<Vec<(ZoneId, i32)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        events
            .volume_changed
            .observe(move |ev| seen_clone.lock().push((ev.zone, ev.value)));
        seen
    }

    #[tokio::test]
    async fn sample_emits_only_on_change() {
        let rig = rig();
        rig.transport.volumes.insert("10.0.0.2".to_string(), 30);
        let volumes = collect_volumes(&rig.events);

        rig.volume.sample_volumes(false).await;
        // Zone 0: 0 -> 30; zone 1: 0 -> 0 stays silent.
        assert_eq!(volumes.lock().clone(), vec![(0, 30)]);

        rig.volume.sample_volumes(false).await;
        assert_eq!(volumes.lock().len(), 1);
    }

    #[tokio::test]
    async fn forced_sample_emits_unchanged_values() {
        let rig = rig();
        let volumes = collect_volumes(&rig.events);

        rig.volume.sample_volumes(true).await;
        assert_eq!(volumes.lock().clone(), vec![(0, 0), (1, 0)]);
    }

    #[tokio::test]
    async fn unavailable_zone_samples_sentinel() {
        let rig = rig();
        rig.state.set_available(1, false);
        let volumes = collect_volumes(&rig.events);

        rig.volume.sample_volumes(false).await;
        assert_eq!(volumes.lock().clone(), vec![(1, VOLUME_UNAVAILABLE)]);
    }

    #[tokio::test]
    async fn balance_is_right_minus_left() {
        let rig = rig();
        rig.transport
            .channel_volumes
            .insert(("10.0.0.2".to_string(), AudioChannel::LeftFront), 100);
        rig.transport
            .channel_volumes
            .insert(("10.0.0.2".to_string(), AudioChannel::RightFront), 80);

        let balances = Arc::new(Mutex::new(Vec::new()));
        let balances_clone = Arc::clone(&balances);
        rig.events
            .balance_changed
            .observe(move |ev| balances_clone.lock().push((ev.zone, ev.value)));

        rig.volume.sample_balances(false).await;
        assert_eq!(balances.lock().clone(), vec![(0, -20)]);
    }

    #[tokio::test]
    async fn equalize_writes_every_available_zone() {
        let rig = rig();
        rig.volume
            .set_volume(0, VolumeAction::EqualizeAll(25))
            .await
            .unwrap();

        let commands = rig.transport.issued_commands();
        assert!(commands.contains(&"set_volume 10.0.0.2 25".to_string()));
        assert!(commands.contains(&"set_volume 10.0.0.3 25".to_string()));
    }

    #[tokio::test]
    async fn relative_volume_steps_clamp() {
        let rig = rig();
        rig.transport.volumes.insert("10.0.0.2".to_string(), 98);

        rig.volume.set_volume(0, VolumeAction::Up(5)).await.unwrap();
        assert_eq!(*rig.transport.volumes.get("10.0.0.2").unwrap(), 100);

        rig.transport.volumes.insert("10.0.0.2".to_string(), 2);
        rig.volume
            .set_volume(0, VolumeAction::Down(5))
            .await
            .unwrap();
        assert_eq!(*rig.transport.volumes.get("10.0.0.2").unwrap(), 0);
    }

    #[tokio::test]
    async fn balance_left_pins_louder_side() {
        let rig = rig();
        // Both channels at 100 (defaults): left >= right, so right drops.
        rig.volume
            .set_balance(0, BalanceAction::Left, 5)
            .await
            .unwrap();

        assert_eq!(
            *rig.transport
                .channel_volumes
                .get(&("10.0.0.2".to_string(), AudioChannel::LeftFront))
                .unwrap(),
            100
        );
        assert_eq!(
            *rig.transport
                .channel_volumes
                .get(&("10.0.0.2".to_string(), AudioChannel::RightFront))
                .unwrap(),
            95
        );
    }

    #[tokio::test]
    async fn commands_on_unavailable_zone_fail() {
        let rig = rig();
        rig.state.set_available(0, false);
        let err = rig
            .volume
            .set_volume(0, VolumeAction::Absolute(10))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ZoneUnavailable(0)));
    }
}
