//! Engine configuration and the owned fleet state aggregate.
//!
//! All mutable per-zone data lives in [`FleetState`], one record per zone
//! behind its own lock. The engine reproduces the single-writer-per-zone
//! guarantee of a cooperative design: whichever task mutates a zone's
//! record holds that zone's lock, and locks are never held across
//! transport round trips.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::zone::record::{SuppressionFlags, ZoneRecord};
use crate::zone::transport::BrowseItem;
use crate::zone::types::{GroupSnapshot, Zone, ZoneConfig, ZoneId};

/// Configuration for the synchronization engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Period of the primary task: notification polling + topology refresh
    /// (milliseconds).
    pub primary_period_ms: u64,

    /// Period of the secondary task: dirty-counter pull refreshes
    /// (milliseconds).
    pub secondary_period_ms: u64,

    /// Period of the sleep-timer polling task (milliseconds).
    pub sleep_timer_period_ms: u64,

    /// Bounded wait for one queued notification poll (milliseconds).
    pub poll_timeout_ms: u64,

    /// Page size for queue and music-database range fetches.
    pub browse_page_size: u32,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_period_ms == 0 || self.secondary_period_ms == 0 {
            return Err("scheduler periods must be >= 1ms".to_string());
        }
        if self.sleep_timer_period_ms == 0 {
            return Err("sleep_timer_period_ms must be >= 1ms".to_string());
        }
        if self.browse_page_size == 0 {
            return Err("browse_page_size must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_period_ms: 100,
            secondary_period_ms: 100,
            sleep_timer_period_ms: 1000,
            poll_timeout_ms: 500,
            browse_page_size: 1000,
        }
    }
}

/// One discovered line-in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxInput {
    /// User-visible source name.
    pub name: String,
    /// Node the source is attached to.
    pub node: String,
}

/// Cached music-database browse results.
#[derive(Debug, Clone, Default)]
pub struct MusicDbIndex {
    pub artists: Vec<BrowseItem>,
    pub albums: Vec<BrowseItem>,
    pub genres: Vec<BrowseItem>,
}

/// The fleet's entire mutable state.
///
/// Zones are enumerated once at construction and never removed; only their
/// availability flag changes. Per-zone records carry their own locks so a
/// slow zone never blocks processing of the rest of the fleet.
pub struct FleetState {
    zones: RwLock<Vec<Zone>>,
    records: Vec<Mutex<ZoneRecord>>,
    suppression: Vec<SuppressionFlags>,
    groups: RwLock<GroupSnapshot>,
    favorites: Mutex<Vec<String>>,
    music_db: Mutex<MusicDbIndex>,
    aux_inputs: Mutex<Vec<AuxInput>>,
}

impl FleetState {
    /// Builds the state aggregate from the static zone configuration.
    #[must_use]
    pub fn new(configs: &[ZoneConfig]) -> Self {
        let zones = configs
            .iter()
            .enumerate()
            .map(|(index, cfg)| Zone {
                index,
                name: String::new(),
                nodes: cfg.nodes.clone(),
                available: false,
            })
            .collect::<Vec<_>>();
        let count = zones.len();

        Self {
            zones: RwLock::new(zones),
            records: (0..count).map(|_| Mutex::new(ZoneRecord::default())).collect(),
            suppression: (0..count).map(|_| SuppressionFlags::default()).collect(),
            groups: RwLock::new(GroupSnapshot::ungrouped(count)),
            favorites: Mutex::new(Vec::new()),
            music_db: Mutex::new(MusicDbIndex::default()),
            aux_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Number of configured zones.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.records.len()
    }

    /// Snapshot of one zone's static info + availability.
    #[must_use]
    pub fn zone(&self, zone: ZoneId) -> Option<Zone> {
        self.zones.read().get(zone).cloned()
    }

    /// Snapshot of every zone.
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        self.zones.read().clone()
    }

    /// Whether the zone answered its last availability probe.
    #[must_use]
    pub fn is_available(&self, zone: ZoneId) -> bool {
        self.zones.read().get(zone).is_some_and(|z| z.available)
    }

    /// Updates a zone's availability; returns the previous value.
    pub fn set_available(&self, zone: ZoneId, available: bool) -> bool {
        let mut zones = self.zones.write();
        match zones.get_mut(zone) {
            Some(z) => std::mem::replace(&mut z.available, available),
            None => false,
        }
    }

    /// Records a zone's display name from a successful speaker-info probe.
    pub fn set_zone_name(&self, zone: ZoneId, name: &str) {
        if let Some(z) = self.zones.write().get_mut(zone) {
            if z.name != name {
                z.name = name.to_string();
            }
        }
    }

    /// Primary node address of an *available* zone; `None` when the zone is
    /// unknown or currently unavailable.
    #[must_use]
    pub fn primary_node(&self, zone: ZoneId) -> Option<String> {
        self.zones
            .read()
            .get(zone)
            .filter(|z| z.available)
            .map(|z| z.primary_node().to_string())
    }

    /// All node addresses of a zone, regardless of availability.
    #[must_use]
    pub fn node_addresses(&self, zone: ZoneId) -> Vec<String> {
        self.zones
            .read()
            .get(zone)
            .map(|z| z.nodes.clone())
            .unwrap_or_default()
    }

    /// The lock over one zone's record.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range zone index; indices come from the fleet
    /// configuration and are validated at the command surface.
    #[must_use]
    pub fn record(&self, zone: ZoneId) -> &Mutex<ZoneRecord> {
        &self.records[zone]
    }

    /// The suppression flags of one zone.
    #[must_use]
    pub fn suppression(&self, zone: ZoneId) -> &SuppressionFlags {
        &self.suppression[zone]
    }

    /// The last committed group snapshot.
    #[must_use]
    pub fn groups(&self) -> GroupSnapshot {
        self.groups.read().clone()
    }

    /// Commits a new group snapshot, returning the previous one.
    pub fn set_groups(&self, snapshot: GroupSnapshot) -> GroupSnapshot {
        std::mem::replace(&mut *self.groups.write(), snapshot)
    }

    /// Coordinator of the given zone per the committed snapshot.
    #[must_use]
    pub fn coordinator_of(&self, zone: ZoneId) -> ZoneId {
        self.groups.read().coordinator_of(zone)
    }

    /// Member list of the given zone's group per the committed snapshot.
    #[must_use]
    pub fn members_of(&self, zone: ZoneId) -> Vec<ZoneId> {
        self.groups.read().members_of(zone)
    }

    /// The cached favorite-radio title list.
    #[must_use]
    pub fn favorites(&self) -> Vec<String> {
        self.favorites.lock().clone()
    }

    /// Replaces the favorites list; returns `true` when it actually changed.
    pub fn set_favorites(&self, titles: Vec<String>) -> bool {
        let mut favorites = self.favorites.lock();
        if *favorites == titles {
            false
        } else {
            *favorites = titles;
            true
        }
    }

    /// The cached music-database index.
    #[must_use]
    pub fn music_db(&self) -> MusicDbIndex {
        self.music_db.lock().clone()
    }

    /// Replaces the music-database index.
    pub fn set_music_db(&self, index: MusicDbIndex) {
        *self.music_db.lock() = index;
    }

    /// The discovered line-in sources.
    #[must_use]
    pub fn aux_inputs(&self) -> Vec<AuxInput> {
        self.aux_inputs.lock().clone()
    }

    /// Replaces the discovered line-in sources.
    pub fn set_aux_inputs(&self, inputs: Vec<AuxInput>) {
        *self.aux_inputs.lock() = inputs;
    }

    /// Serializes the current fleet view to JSON: zones, the committed
    /// group snapshot, per-zone playback state and the aux source list.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let playback: Vec<_> = (0..self.zone_count())
            .map(|zone| json!(self.record(zone).lock().playback))
            .collect();
        json!({
            "zones": *self.zones.read(),
            "groups": *self.groups.read(),
            "playback": playback,
            "auxInputs": *self.aux_inputs.lock(),
        })
    }
}

impl std::fmt::Debug for FleetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetState")
            .field("zones", &self.zone_count())
            .field("groups", &*self.groups.read())
            .finish()
    }
}
