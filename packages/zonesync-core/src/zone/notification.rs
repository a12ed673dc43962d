//! Notification payloads delivered by the device transport.
//!
//! The transport adapter parses raw device events into these structures;
//! missing or unparsable fields are coerced to empty strings / `None`
//! rather than failing the whole notification.

use serde::Serialize;

/// The five per-zone event channels a subscription can be held on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationChannel {
    RenderingControl,
    AvTransport,
    ContentDirectory,
    ZoneGroupTopology,
    DeviceProperties,
}

impl NotificationChannel {
    /// All channels, in the order they are polled each cycle.
    pub const ALL: [NotificationChannel; 5] = [
        NotificationChannel::RenderingControl,
        NotificationChannel::AvTransport,
        NotificationChannel::ContentDirectory,
        NotificationChannel::ZoneGroupTopology,
        NotificationChannel::DeviceProperties,
    ];

    /// Short channel label for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RenderingControl => "rendering-control",
            Self::AvTransport => "av-transport",
            Self::ContentDirectory => "content-directory",
            Self::ZoneGroupTopology => "zone-group-topology",
            Self::DeviceProperties => "device-properties",
        }
    }
}

/// One queued notification, already classified per channel.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Rendering-control change (volume / channel volume). The engine
    /// re-samples rather than trusting event payload values.
    Rendering,
    /// Transport event for a coordinator zone.
    Transport(TransportEventPayload),
    /// Content-directory change: opaque version stamps per resource.
    ContentDirectory(ContentUpdateStamps),
    /// Zone-group topology changed somewhere in the fleet.
    Topology,
    /// Device-properties change; currently informational only.
    DeviceProperties,
}

/// Raw transport-event payload as delivered on the av-transport channel.
///
/// String fields are the device's own representations; classification and
/// parsing happen in the playback synchronizer. An empty `transport_state`
/// marks a payload that carried no state change (e.g. a pure
/// sleep-timer-generation event).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportEventPayload {
    /// Raw transport state string (`PLAYING`, `PAUSED_PLAYBACK`, ...).
    pub transport_state: String,
    /// Raw transport status string (usually `OK`).
    pub transport_status: String,
    /// Title from the current-track metadata, empty when absent.
    pub current_track_meta_title: String,
    /// Enqueued transport URI; radio streams are recognized by its scheme.
    pub enqueued_uri: String,
    /// Title from the enqueued-transport metadata, empty when absent.
    pub enqueued_meta_title: String,
    /// Current track index, as the device reports it.
    pub current_track_index: String,
    /// Current play mode string.
    pub play_mode: String,
    /// Present when the device announces a sleep-timer generation change.
    pub sleep_timer_generation: Option<String>,
}

impl TransportEventPayload {
    /// Whether this payload carries an authoritative transport state.
    #[must_use]
    pub fn has_transport_state(&self) -> bool {
        !self.transport_state.is_empty()
    }
}

/// Opaque version stamps from a content-directory notification.
///
/// Stamps are monotonic tokens from the transport layer; the engine only
/// ever compares them for equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentUpdateStamps {
    /// Queue container update stamp.
    pub container_update_ids: Option<String>,
    /// Favorite-radios update stamp.
    pub favorites_update_id: Option<String>,
    /// Music-database share-list update stamp.
    pub share_list_update_id: Option<String>,
}
