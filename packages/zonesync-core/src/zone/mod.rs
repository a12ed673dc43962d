//! Zone domain: types, per-zone state records, version tracking and the
//! device transport seam.
//!
//! # Module Structure
//!
//! - `types` - Zones, groups, playback state and source classification
//! - `notification` - Per-channel notification payloads
//! - `transport` - The `ZoneTransport` trait the engine consumes
//! - `versions` - Committed/observed version counters per resource
//! - `record` - The per-zone mutable state record and suppression flags

pub mod notification;
pub mod record;
pub mod transport;
pub mod types;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export the transport seam
pub use transport::{TransportError, TransportResult, ZoneTransport};

// Re-export core domain types
pub use types::{GroupSnapshot, PlaybackState, SourceKind, TransportState, Zone, ZoneConfig, ZoneId};
