//! The per-zone mutable state record.
//!
//! One record exists per configured zone, locked individually so that the
//! scheduler tasks and command paths serialize their mutations per zone
//! without blocking the rest of the fleet.

use std::sync::atomic::{AtomicBool, Ordering};

use super::notification::TransportEventPayload;
use super::types::PlaybackState;
use super::versions::VersionCounters;

/// Balance sentinel for unavailable zones (outside the -100..=100 range).
pub const BALANCE_UNAVAILABLE: i32 = -111;

/// Volume sentinel for unavailable zones.
pub const VOLUME_UNAVAILABLE: i32 = -1;

/// All mutable state owned by one zone.
///
/// Mutations go through the owning `Mutex`; locks are never held across
/// transport round trips.
#[derive(Debug, Default)]
pub struct ZoneRecord {
    /// Canonical playback state, maintained by the playback synchronizer.
    pub playback: PlaybackState,
    /// Committed/observed stamps for queue, favorites and music database.
    pub counters: VersionCounters,
    /// Last raw transport payload seen for this zone; replayed when a
    /// topology change shifts coordinator assignment.
    pub last_transport_payload: Option<TransportEventPayload>,
    /// Cached volume; [`VOLUME_UNAVAILABLE`] while the zone is unreachable.
    pub volume: i32,
    /// Cached balance (right minus left); [`BALANCE_UNAVAILABLE`] while the
    /// zone is unreachable.
    pub balance: i32,
    /// Last committed queue title list.
    pub queue_titles: Vec<String>,
    /// Play mode as of the last queue refresh.
    pub queue_play_mode: String,
    /// Remaining sleep-timer seconds, `None` when no timer is set.
    pub sleep_timer_secs: Option<u64>,
    /// Set when a queue version stamp has been observed but the refetch has
    /// not yet committed; gates selected-track emission.
    pub queue_refresh_pending: bool,
}

/// Transient per-zone guard flags for in-flight commands.
///
/// Commands set these immediately before the transport round trip and clear
/// them when it completes, success or failure; the window must cover the
/// full duration of the command. Atomics because the command path and the
/// scheduler touch them from different tasks.
#[derive(Debug, Default)]
pub struct SuppressionFlags {
    queue_removal: AtomicBool,
    recoordination: AtomicBool,
}

impl SuppressionFlags {
    /// Whether a queue-item-removal command is in flight; while set, queue
    /// version stamps are not observed for this zone.
    #[must_use]
    pub fn queue_removal_active(&self) -> bool {
        self.queue_removal.load(Ordering::SeqCst)
    }

    /// Whether a group-recoordination command is in flight; while set,
    /// selected-track events are not emitted for this zone.
    #[must_use]
    pub fn recoordination_active(&self) -> bool {
        self.recoordination.load(Ordering::SeqCst)
    }

    pub(crate) fn set_queue_removal(&self, active: bool) {
        self.queue_removal.store(active, Ordering::SeqCst);
    }

    pub(crate) fn set_recoordination(&self, active: bool) {
        self.recoordination.store(active, Ordering::SeqCst);
    }
}

/// Which suppression window a [`SuppressionGuard`] holds open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionKind {
    QueueRemoval,
    Recoordination,
}

/// RAII guard over one zone's suppression flag.
///
/// Dropping the guard clears the flag, so the window closes on every exit
/// path of the command, including errors.
pub struct SuppressionGuard<'a> {
    flags: &'a SuppressionFlags,
    kind: SuppressionKind,
}

impl<'a> SuppressionGuard<'a> {
    /// Opens the suppression window on the given flags.
    pub fn new(flags: &'a SuppressionFlags, kind: SuppressionKind) -> Self {
        match kind {
            SuppressionKind::QueueRemoval => flags.set_queue_removal(true),
            SuppressionKind::Recoordination => flags.set_recoordination(true),
        }
        Self { flags, kind }
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        match self.kind {
            SuppressionKind::QueueRemoval => self.flags.set_queue_removal(false),
            SuppressionKind::Recoordination => self.flags.set_recoordination(false),
        }
    }
}
