//! Zonesync Core - zone topology and playback state synchronization.
//!
//! This crate maintains a live, consistent view of a fleet of networked
//! audio zones that can be dynamically grouped. It reconciles asynchronous
//! push notifications from devices with periodic pull-based polling,
//! deduplicates redundant updates, tracks group-coordinator relationships
//! and emits change events exactly once per observable state transition.
//!
//! # Architecture
//!
//! - [`zone`]: Domain types, per-zone records, version counters and the
//!   [`ZoneTransport`](zone::ZoneTransport) seam to the device layer
//! - [`events`]: The observer registry of named event channels
//! - [`state`]: Configuration and the owned fleet state aggregate
//! - [`services`]: Topology, playback, subscription, library, volume,
//!   sleep-timer and command services plus the cyclic scheduler
//! - [`engine`]: The composition root wiring everything together
//! - [`runtime`]: Task spawning abstraction
//! - [`error`]: Centralized error types
//!
//! The physical device transport (discovery, command execution, event
//! delivery) is an external collaborator behind the `ZoneTransport` trait;
//! the engine itself performs no network I/O.

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod events;
pub mod runtime;
pub mod services;
pub mod state;
pub mod utils;
pub mod zone;

// Re-export commonly used types at the crate root
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorCode, TransportResult};
pub use events::{EventChannel, EventRegistry, GroupsChanged, ZoneValue};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{AuxInput, Config, FleetState, MusicDbIndex};
pub use utils::format_hms;

// Re-export zone domain types
pub use zone::notification::{
    ContentUpdateStamps, Notification, NotificationChannel, TransportEventPayload,
};
pub use zone::transport::{
    AudioChannel, BrowseItem, FavoriteRadio, GroupInfo, LineInAttributes, MusicDbCategory,
    QueueSlice, SpeakerInfo, SubscriptionHandle, TrackInfo,
};
pub use zone::versions::{ResourceKind, VersionCounter};
pub use zone::{
    GroupSnapshot, PlaybackState, SourceKind, TransportError, TransportState, Zone, ZoneConfig,
    ZoneId, ZoneTransport,
};

// Re-export the command surface vocabulary
pub use services::{
    BalanceAction, CommandSurface, GroupAction, PlayAction, PlayMode, QueueSelection,
    RadioSelector, SleepTimerAction, TrackDirection, VolumeAction,
};
