//! Playback state synchronization.
//!
//! Transport events arrive for group coordinators only (a protocol
//! invariant of the device family, not a choice of this engine). The
//! synchronizer parses each event into canonical [`PlaybackState`] fields,
//! broadcasts them to every member of the coordinator's group, diffs each
//! field against the member's previously stored value and fires one event
//! per observable transition.

use std::sync::Arc;

use crate::events::{EventRegistry, ZoneValue};
use crate::state::FleetState;
use crate::zone::notification::TransportEventPayload;
use crate::zone::transport::ZoneTransport;
use crate::zone::types::{compose_play_state, SourceKind, TransportState, ZoneId};

/// URI scheme prefix identifying radio streams.
const RADIO_URI_PREFIX: &str = "x-sonosapi-stream:";

/// Events collected under a zone's record lock and fired after release, so
/// observer callbacks can never deadlock against the record they observe.
enum PendingEvent {
    TrackSub(ZoneId, String),
    Track(ZoneId, String),
    SelectedTrack(ZoneId, u32),
    PlayMode(ZoneId, String),
    PlayState(ZoneId, String),
}

/// Applies coordinator transport events to all group members.
pub struct PlaybackSynchronizer {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    transport: Arc<dyn ZoneTransport>,
}

impl PlaybackSynchronizer {
    /// Creates a new synchronizer over the shared fleet state.
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

    /// Applies one raw transport event received for `zone`.
    ///
    /// No-op (logged) when `zone` is not its own group's coordinator: only
    /// coordinators receive authoritative transport notifications. With
    /// `reconcile` set (topology-change reconciliation pass), selected-track
    /// events widen from the coordinator to every group member.
    pub async fn apply_transport_event(
        &self,
        zone: ZoneId,
        payload: &TransportEventPayload,
        reconcile: bool,
    ) {
        let coordinator = self.state.coordinator_of(zone);
        if coordinator != zone {
            log::debug!(
                "[PlaybackSync] Zone {} is not its group's coordinator ({}), ignoring transport event",
                zone,
                coordinator
            );
            return;
        }

        let Some(node) = self.state.primary_node(zone) else {
            log::debug!("[PlaybackSync] Zone {} unavailable, ignoring transport event", zone);
            return;
        };

        // Aux playback is an explicit device flag, not derivable from the event.
        let line_in = match self.transport.is_playing_line_in(&node).await {
            Ok(flag) => flag,
            Err(err) => {
                log::debug!("[PlaybackSync] Line-in query failed for zone {}: {}", zone, err);
                false
            }
        };

        let source = if line_in {
            SourceKind::LineIn
        } else if payload.enqueued_uri.starts_with(RADIO_URI_PREFIX) {
            SourceKind::Radio
        } else {
            SourceKind::MusicDb
        };

        let track_meta = payload.current_track_meta_title.clone();

        // Track title: the enqueued metadata when present, otherwise the
        // current-track metadata (which covers line-in names).
        let track = if payload.enqueued_meta_title.is_empty() {
            track_meta.clone()
        } else {
            payload.enqueued_meta_title.clone()
        };

        // Display name: radio reads live track info (artist - title); aux and
        // music-database use the raw current-track metadata title.
        let track_sub = match source {
            SourceKind::Radio => match self.transport.get_current_track_info(&node).await {
                Ok(info) => format!("{} - {}", info.artist, info.title),
                Err(err) => {
                    log::debug!(
                        "[PlaybackSync] Track-info query failed for zone {}: {}",
                        zone,
                        err
                    );
                    track_meta.clone()
                }
            },
            _ => track_meta.clone(),
        };

        let track_index: u32 = payload.current_track_index.parse().unwrap_or(0);
        let transport_state = TransportState::parse(&payload.transport_state);

        // Validity computation is unresolved upstream; the flag stays a
        // first-class field and currently always evaluates true.
        let is_valid = true;

        let members = self.state.members_of(coordinator);
        for member in members {
            let mut pending: Vec<PendingEvent> = Vec::new();
            {
                let mut record = self.state.record(member).lock();
                let queue_refresh_pending = record.queue_refresh_pending;
                let playback = &mut record.playback;

                if playback.track_sub != track_sub {
                    if member == coordinator {
                        log::info!(
                            "[PlaybackSync] Zone {} track display: {}",
                            member,
                            track_sub
                        );
                    }
                    playback.track_sub = track_sub.clone();
                    pending.push(PendingEvent::TrackSub(member, track_sub.clone()));
                }

                if playback.track != track {
                    playback.track = track.clone();
                    pending.push(PendingEvent::Track(member, track.clone()));
                }

                if playback.track_meta != track_meta {
                    playback.track_meta = track_meta.clone();
                    tracing::debug!(zone = member, meta = %track_meta, "track_meta");
                }

                if playback.source != source {
                    playback.source = source;
                    tracing::debug!(zone = member, ?source, "source_kind");
                }

                if playback.track_index != track_index {
                    playback.track_index = track_index;
                    let suppressed = source.is_external()
                        || queue_refresh_pending
                        || self.state.suppression(member).recoordination_active();
                    if !suppressed && (member == coordinator || reconcile) {
                        pending.push(PendingEvent::SelectedTrack(member, track_index));
                    }
                }

                if playback.play_mode != payload.play_mode {
                    playback.play_mode = payload.play_mode.clone();
                    pending.push(PendingEvent::PlayMode(member, payload.play_mode.clone()));
                }

                if playback.transport_state != transport_state {
                    playback.transport_state = transport_state.clone();
                    tracing::debug!(zone = member, state = ?transport_state, "transport_state");
                }

                if playback.transport_status != payload.transport_status {
                    playback.transport_status = payload.transport_status.clone();
                    tracing::debug!(zone = member, status = %payload.transport_status, "transport_status");
                }

                if playback.is_valid != is_valid {
                    playback.is_valid = is_valid;
                }

                if playback.is_valid {
                    let composed =
                        compose_play_state(&playback.transport_state, playback.source, playback.track_index);
                    if playback.composed != composed {
                        playback.composed = composed.clone();
                        pending.push(PendingEvent::PlayState(member, composed));
                    }
                }
            }

            for event in pending {
                match event {
                    PendingEvent::TrackSub(z, v) => self
                        .events
                        .play_track_sub_changed
                        .emit(&ZoneValue::new(z, v)),
                    PendingEvent::Track(z, v) => {
                        self.events.play_track_changed.emit(&ZoneValue::new(z, v))
                    }
                    PendingEvent::SelectedTrack(z, v) => self
                        .events
                        .play_track_index_changed
                        .emit(&ZoneValue::new(z, v)),
                    PendingEvent::PlayMode(z, v) => {
                        self.events.play_mode_changed.emit(&ZoneValue::new(z, v))
                    }
                    PendingEvent::PlayState(z, v) => {
                        self.events.play_state_changed.emit(&ZoneValue::new(z, v))
                    }
                }
            }
        }
    }
}
