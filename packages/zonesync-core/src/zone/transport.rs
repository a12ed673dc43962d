//! Trait abstraction over the device transport.
//!
//! The engine never talks a wire protocol itself; everything it knows about
//! a node goes through [`ZoneTransport`]. This is the seam that keeps
//! discovery, SOAP command execution and event subscription delivery out of
//! the core and makes every service testable against a scripted mock.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::notification::{Notification, NotificationChannel};
use super::types::TransportState;

/// Failures reported by the transport adapter.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The node did not answer (network error, device offline).
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// Establishing or renewing an event subscription failed.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// The device reported a transient protocol state and cannot accept the
    /// command right now.
    #[error("device in transition: {0}")]
    InTransition(String),

    /// The device refused the command outright.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// A response or notification was structurally unusable even after
    /// best-effort coercion.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether the failure is expected to clear on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::InTransition(_))
    }
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Identity and model information for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerInfo {
    pub name: String,
    pub model: String,
}

/// Group membership as one node reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupInfo {
    /// Addresses of every member node of the group.
    pub member_nodes: Vec<String>,
    /// Address of the group's coordinator node.
    pub coordinator_node: String,
}

/// Opaque handle for an established event subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    /// Transport-assigned subscription identifier.
    pub sid: String,
}

/// Live track information, queried on demand for radio display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
}

/// A favorite radio station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteRadio {
    pub title: String,
    pub uri: String,
}

/// One browsable music-database item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseItem {
    pub title: String,
    /// Transport-level identifier, usable with [`ZoneTransport::add_to_queue`].
    pub item_id: String,
}

/// Music-database browse categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MusicDbCategory {
    Artists,
    Albums,
    Genres,
    Tracks,
}

/// One window of the play queue plus the device-reported total length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSlice {
    pub titles: Vec<String>,
    pub total_size: u32,
}

/// Per-speaker output channels used for balance control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioChannel {
    LeftFront,
    RightFront,
}

impl AudioChannel {
    /// Device-level channel label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftFront => "LF",
            Self::RightFront => "RF",
        }
    }
}

/// Line-in attributes of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInAttributes {
    /// User-visible source name.
    pub name: String,
    /// Source kind label; `AudioComponent` marks a usable line-in source.
    pub kind: String,
}

impl LineInAttributes {
    /// Label the transport reports for a connected line-in source.
    pub const AUDIO_COMPONENT: &'static str = "AudioComponent";

    /// Whether this node exposes a usable line-in source.
    #[must_use]
    pub fn is_audio_component(&self) -> bool {
        self.kind == Self::AUDIO_COMPONENT
    }
}

/// The device transport adapter consumed by the engine.
///
/// Nodes are addressed by their network address string. Commands are
/// synchronous round trips; timeouts are the adapter's responsibility.
#[async_trait]
pub trait ZoneTransport: Send + Sync {
    // ── Identity & topology ──────────────────────────────────────────────

    /// Queries name and model of one node. Failure marks the zone
    /// unavailable until a later probe succeeds.
    async fn get_speaker_info(&self, node: &str) -> TransportResult<SpeakerInfo>;

    /// Queries the group membership and coordinator as this node sees it.
    async fn get_group_info(&self, node: &str) -> TransportResult<GroupInfo>;

    /// Joins `node` into the group coordinated by `target`.
    async fn join_group(&self, node: &str, target: &str) -> TransportResult<()>;

    /// Removes `node` from its group, making it standalone.
    async fn unjoin(&self, node: &str) -> TransportResult<()>;

    // ── Event subscriptions ──────────────────────────────────────────────

    /// Establishes a subscription for one channel on one node.
    async fn subscribe(
        &self,
        node: &str,
        channel: NotificationChannel,
    ) -> TransportResult<SubscriptionHandle>;

    /// Whether the subscription behind `handle` is still being serviced.
    async fn is_subscription_active(&self, handle: &SubscriptionHandle) -> bool;

    /// Bounded-wait poll for one queued notification. `Ok(None)` means no
    /// notification arrived within `timeout`.
    async fn poll_notification(
        &self,
        handle: &SubscriptionHandle,
        timeout: Duration,
    ) -> TransportResult<Option<Notification>>;

    // ── Playback ─────────────────────────────────────────────────────────

    /// Current transport state, queried live (used by play/pause toggling).
    async fn get_transport_info(&self, node: &str) -> TransportResult<TransportState>;

    /// Live current-track info (artist / title).
    async fn get_current_track_info(&self, node: &str) -> TransportResult<TrackInfo>;

    /// Whether the node is currently playing its line-in source.
    async fn is_playing_line_in(&self, node: &str) -> TransportResult<bool>;

    async fn play(&self, node: &str) -> TransportResult<()>;
    async fn pause(&self, node: &str) -> TransportResult<()>;
    async fn next_track(&self, node: &str) -> TransportResult<()>;
    async fn previous_track(&self, node: &str) -> TransportResult<()>;

    /// Plays a URI directly (radio streams), with a display title.
    async fn play_uri(&self, node: &str, uri: &str, title: &str) -> TransportResult<()>;

    /// Starts playback from a queue position.
    async fn play_from_queue(&self, node: &str, index: u32) -> TransportResult<()>;

    /// Sets the device play mode (`NORMAL`, `SHUFFLE_NOREPEAT`, ...).
    async fn set_play_mode(&self, node: &str, mode: &str) -> TransportResult<()>;

    /// Switches the node to one of the fleet's line-in sources.
    async fn switch_to_line_in(&self, node: &str, source_node: &str) -> TransportResult<()>;

    /// Queries the node's line-in attributes (aux discovery).
    async fn get_line_in_attributes(&self, node: &str) -> TransportResult<LineInAttributes>;

    // ── Volume / balance ─────────────────────────────────────────────────

    async fn get_volume(&self, node: &str) -> TransportResult<u8>;
    async fn set_volume(&self, node: &str, volume: u8) -> TransportResult<()>;
    async fn get_channel_volume(&self, node: &str, channel: AudioChannel) -> TransportResult<u8>;
    async fn set_channel_volume(
        &self,
        node: &str,
        channel: AudioChannel,
        volume: u8,
    ) -> TransportResult<()>;

    // ── Sleep timer ──────────────────────────────────────────────────────

    /// Remaining sleep-timer seconds, `None` when no timer is set.
    async fn get_sleep_timer(&self, node: &str) -> TransportResult<Option<u64>>;

    /// Sets (`Some(seconds)`) or cancels (`None`) the sleep timer.
    async fn set_sleep_timer(&self, node: &str, seconds: Option<u64>) -> TransportResult<()>;

    // ── Library & queue ──────────────────────────────────────────────────

    /// The favorite radio stations list.
    async fn get_favorite_radios(&self, node: &str) -> TransportResult<Vec<FavoriteRadio>>;

    /// Browses one music-database category over a range.
    async fn browse_music_db(
        &self,
        node: &str,
        category: MusicDbCategory,
        start: u32,
        count: u32,
    ) -> TransportResult<Vec<BrowseItem>>;

    /// Fetches a window of the play queue.
    async fn get_queue_slice(&self, node: &str, start: u32, count: u32)
        -> TransportResult<QueueSlice>;

    /// Appends a browsable item to the queue.
    async fn add_to_queue(&self, node: &str, item_id: &str) -> TransportResult<()>;

    /// Removes a single queue entry.
    async fn remove_from_queue(&self, node: &str, index: u32) -> TransportResult<()>;

    /// Empties the queue.
    async fn clear_queue(&self, node: &str) -> TransportResult<()>;
}
