//! Domain types for zones, groups, and playback state.

use serde::Serialize;

/// Stable zone identity: the zone's position in the configured fleet.
pub type ZoneId = usize;

/// Static configuration for one zone.
///
/// A zone owns one or two nodes (a stereo pair shares one logical zone but
/// exposes two physical endpoints). The first node is the primary; shared
/// attributes are only ever queried from it.
#[derive(Debug, Clone)]
pub struct ZoneConfig {
    /// Network addresses of the zone's nodes, primary first.
    pub nodes: Vec<String>,
}

impl ZoneConfig {
    /// Single-node zone.
    pub fn single(node: impl Into<String>) -> Self {
        Self {
            nodes: vec![node.into()],
        }
    }

    /// Stereo pair: two nodes backing one logical zone.
    pub fn pair(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            nodes: vec![primary.into(), secondary.into()],
        }
    }
}

/// A logical playback endpoint.
///
/// Zones are enumerated once from static configuration and never destroyed;
/// availability is re-evaluated on every topology poll.
#[derive(Debug, Clone, Serialize)]
pub struct Zone {
    /// Array-position identity within the fleet.
    pub index: ZoneId,
    /// Display name, filled in from the first successful speaker-info probe.
    pub name: String,
    /// Node addresses, primary first.
    pub nodes: Vec<String>,
    /// Whether every node of the zone answered the last availability probe.
    pub available: bool,
}

impl Zone {
    /// The primary node address. Shared attributes (volume, transport state,
    /// group membership) are queried from this node only.
    #[must_use]
    pub fn primary_node(&self) -> &str {
        &self.nodes[0]
    }
}

/// Classification of what a zone is currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A radio stream (URI carries the radio-stream scheme prefix).
    Radio,
    /// Line-in playback (explicit aux flag from the device).
    LineIn,
    /// Music-database / queue playback (the default classification).
    MusicDb,
    /// Nothing observed yet.
    #[default]
    None,
}

impl SourceKind {
    /// Radio and line-in sources have no meaningful queue position.
    #[must_use]
    pub fn is_external(self) -> bool {
        matches!(self, Self::Radio | Self::LineIn)
    }
}

/// Transport state as reported by the device.
///
/// Unknown strings are preserved verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    Playing,
    PausedPlayback,
    #[default]
    Stopped,
    Transitioning,
    Other(String),
}

impl TransportState {
    /// Parses a device transport-state string, best effort.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PLAYING" => Self::Playing,
            "PAUSED_PLAYBACK" => Self::PausedPlayback,
            "STOPPED" => Self::Stopped,
            "TRANSITIONING" => Self::Transitioning,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Canonical per-zone playback state.
///
/// Mutated only by the playback synchronizer; every field is diffed against
/// the previously stored value before any event fires.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Track title (from the enqueued transport metadata when present).
    pub track: String,
    /// Display track name: source-dependent composition (see the synchronizer).
    pub track_sub: String,
    /// Raw current-track metadata title.
    pub track_meta: String,
    /// Source classification.
    pub source: SourceKind,
    /// Current track index within the queue (0 when not applicable).
    pub track_index: u32,
    /// Device play mode string (e.g. `NORMAL`, `SHUFFLE_NOREPEAT`).
    pub play_mode: String,
    /// Transport state.
    pub transport_state: TransportState,
    /// Transport status string (usually `OK`).
    pub transport_status: String,
    /// Validity flag. Computation is unresolved upstream; the synchronizer
    /// currently always evaluates it to `true` (see DESIGN.md).
    pub is_valid: bool,
    /// Device-reported queue length, maintained per zone.
    pub queue_size: u32,
    /// Composed display state, e.g. `PLAY4`, `PAUSE4`, `PLAY`, `STOP`.
    pub composed: String,
}

/// Derives the composed display state from transport state, source kind and
/// track index.
///
/// Radio and line-in playback carry no queue position, so they compose
/// without the index suffix. Every transport state other than playing or
/// paused composes as `STOP`.
#[must_use]
pub fn compose_play_state(state: &TransportState, source: SourceKind, track_index: u32) -> String {
    match state {
        TransportState::Playing if source.is_external() => "PLAY".to_string(),
        TransportState::Playing => format!("PLAY{track_index}"),
        TransportState::PausedPlayback if source.is_external() => "PAUSE".to_string(),
        TransportState::PausedPlayback => format!("PAUSE{track_index}"),
        _ => "STOP".to_string(),
    }
}

/// One committed snapshot of the fleet's group topology.
///
/// `members[z]` is the ordered set of zone indices grouped with zone `z`
/// (including `z` itself); `coordinators[z]` is the index of `z`'s group
/// coordinator. Unavailable zones contribute an empty membership and
/// themselves as coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
    pub members: Vec<Vec<ZoneId>>,
    pub coordinators: Vec<ZoneId>,
}

impl GroupSnapshot {
    /// Snapshot where every zone is alone and its own coordinator.
    #[must_use]
    pub fn ungrouped(zone_count: usize) -> Self {
        Self {
            members: (0..zone_count).map(|z| vec![z]).collect(),
            coordinators: (0..zone_count).collect(),
        }
    }

    /// Coordinator of the given zone. Out-of-range indices coordinate
    /// themselves, preserving the self-coordination default.
    #[must_use]
    pub fn coordinator_of(&self, zone: ZoneId) -> ZoneId {
        self.coordinators.get(zone).copied().unwrap_or(zone)
    }

    /// Group member list for the given zone. Never empty: a zone with no
    /// recorded membership is treated as grouped with itself only.
    #[must_use]
    pub fn members_of(&self, zone: ZoneId) -> Vec<ZoneId> {
        match self.members.get(zone) {
            Some(m) if !m.is_empty() => m.clone(),
            _ => vec![zone],
        }
    }
}
