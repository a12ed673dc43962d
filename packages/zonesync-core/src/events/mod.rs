//! Event system: the named channels external observers attach to.
//!
//! Every observable state transition in the engine fires exactly one of
//! these channels, once, with the zone index and the new value. Channels
//! are independent; registering on one has no effect on the others.

mod registry;

pub use registry::EventChannel;

use serde::Serialize;

use crate::zone::types::ZoneId;

/// Payload of the groups-changed channel: the full group and coordinator
/// lists, emitted once per topology refresh whether or not anything changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsChanged {
    pub groups: Vec<Vec<ZoneId>>,
    pub coordinators: Vec<ZoneId>,
}

/// Payload of every per-zone channel: the zone index plus the new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneValue<T> {
    pub zone: ZoneId,
    pub value: T,
}

impl<T> ZoneValue<T> {
    pub fn new(zone: ZoneId, value: T) -> Self {
        Self { zone, value }
    }
}

/// The engine's observer registry: one channel per observable concern.
///
/// External listeners register handlers before or after the scheduler
/// starts; emission happens synchronously from the producing task.
#[derive(Debug)]
pub struct EventRegistry {
    /// Full group/coordinator lists, once per topology refresh.
    pub groups_changed: EventChannel<GroupsChanged>,
    /// Cached zone volume changed (or was force-sampled at warm-up).
    pub volume_changed: EventChannel<ZoneValue<i32>>,
    /// Cached zone balance (right minus left) changed.
    pub balance_changed: EventChannel<ZoneValue<i32>>,
    /// The favorite-radio title list changed.
    pub favorites_changed: EventChannel<ZoneValue<Vec<String>>>,
    /// Composed play state (`PLAY4` / `PAUSE` / `STOP` ...) changed.
    pub play_state_changed: EventChannel<ZoneValue<String>>,
    /// Track title changed.
    pub play_track_changed: EventChannel<ZoneValue<String>>,
    /// Display track name changed.
    pub play_track_sub_changed: EventChannel<ZoneValue<String>>,
    /// Selected track index changed (gated by the suppression rules).
    pub play_track_index_changed: EventChannel<ZoneValue<u32>>,
    /// Play mode changed.
    pub play_mode_changed: EventChannel<ZoneValue<String>>,
    /// The queue title list changed after a pull refresh.
    pub queue_updated: EventChannel<ZoneValue<Vec<String>>>,
    /// Sleep timer display value changed (`None` when the timer is gone).
    pub sleep_timer_changed: EventChannel<ZoneValue<Option<String>>>,
}

impl EventRegistry {
    /// Creates a registry with all channels empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups_changed: EventChannel::new("groups-changed"),
            volume_changed: EventChannel::new("volume-changed"),
            balance_changed: EventChannel::new("balance-changed"),
            favorites_changed: EventChannel::new("favorites-changed"),
            play_state_changed: EventChannel::new("play-state-changed"),
            play_track_changed: EventChannel::new("play-track-changed"),
            play_track_sub_changed: EventChannel::new("play-track-sub-changed"),
            play_track_index_changed: EventChannel::new("play-track-index-changed"),
            play_mode_changed: EventChannel::new("play-mode-changed"),
            queue_updated: EventChannel::new("queue-updated"),
            sleep_timer_changed: EventChannel::new("sleep-timer-changed"),
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn per_zone_channels_deliver_zone_and_value() {
        let registry = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        registry
            .play_track_changed
            .observe(move |ev: &ZoneValue<String>| {
                seen_clone.lock().push((ev.zone, ev.value.clone()));
            });

        registry
            .play_track_changed
            .emit(&ZoneValue::new(2, "Song X".to_string()));

        assert_eq!(*seen.lock(), vec![(2, "Song X".to_string())]);
    }

    #[test]
    fn channels_are_independent() {
        let registry = EventRegistry::new();
        registry.volume_changed.observe(|_| {});
        assert_eq!(registry.volume_changed.handler_count(), 1);
        assert_eq!(registry.balance_changed.handler_count(), 0);
    }
}
