//! Zone group topology management.
//!
//! Every topology poll re-evaluates availability, recomputes the full group
//! snapshot from pairwise device queries, and emits the groups-changed
//! event. When the snapshot differs from the last committed one, playback
//! state is re-evaluated for the affected groups from each coordinator's
//! last raw transport payload, because a coordinator shift changes which
//! zone's payload is authoritative.

use std::sync::Arc;

use crate::events::{EventRegistry, GroupsChanged};
use crate::state::FleetState;
use crate::zone::transport::ZoneTransport;
use crate::zone::types::{GroupSnapshot, ZoneId};

use super::playback::PlaybackSynchronizer;

/// Computes group membership and coordinator assignment for the fleet.
pub struct TopologyManager {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    transport: Arc<dyn ZoneTransport>,
    playback: Arc<PlaybackSynchronizer>,
}

impl TopologyManager {
    /// Creates a new TopologyManager.
    pub fn new(
        state: Arc<FleetState>,
        events: Arc<EventRegistry>,
        transport: Arc<dyn ZoneTransport>,
        playback: Arc<PlaybackSynchronizer>,
    ) -> Self {
        Self {
            state,
            events,
            transport,
            playback,
        }
    }

    /// Re-probes every zone's availability.
    ///
    /// A zone is available only when every node of its (possibly paired)
    /// configuration answers a speaker-info query; the display name is
    /// taken from the primary node.
    pub async fn probe_availability(&self) {
        for zone in 0..self.state.zone_count() {
            let nodes = self.state.node_addresses(zone);
            let mut available = !nodes.is_empty();
            let mut name = None;

            for (position, node) in nodes.iter().enumerate() {
                match self.transport.get_speaker_info(node).await {
                    Ok(info) => {
                        if position == 0 {
                            name = Some(info.name);
                        }
                    }
                    Err(err) => {
                        log::debug!("[Topology] Zone {} node {} not available: {}", zone, node, err);
                        available = false;
                        break;
                    }
                }
            }

            let was_available = self.state.set_available(zone, available);
            if was_available != available {
                log::info!(
                    "[Topology] Zone {} is now {}",
                    zone,
                    if available { "available" } else { "unavailable" }
                );
            }
            if available {
                if let Some(name) = name {
                    self.state.set_zone_name(zone, &name);
                }
            }
        }
    }

    /// Recomputes the group snapshot and propagates the outcome.
    ///
    /// Emits groups-changed once per call regardless of whether anything
    /// changed, keeping passive observers eventually-consistent. Returns
    /// `true` when the snapshot differed from the previous one.
    pub async fn refresh_topology(&self) -> bool {
        self.probe_availability().await;

        let snapshot = self.compute_snapshot().await;
        let previous = self.state.set_groups(snapshot.clone());
        let changed = previous != snapshot;

        self.events.groups_changed.emit(&GroupsChanged {
            groups: snapshot.members.clone(),
            coordinators: snapshot.coordinators.clone(),
        });

        if changed {
            log::info!(
                "[Topology] Groups changed: {:?} coordinators {:?}",
                snapshot.members,
                snapshot.coordinators
            );
            self.reconcile(&previous, &snapshot).await;
        }

        changed
    }

    /// Builds a fresh snapshot from pairwise membership/coordinator queries.
    ///
    /// Unavailable zones keep an empty membership and coordinate themselves;
    /// a zone that stops answering mid-poll is marked unavailable and
    /// skipped for the rest of the pass.
    async fn compute_snapshot(&self) -> GroupSnapshot {
        let count = self.state.zone_count();
        let mut members: Vec<Vec<ZoneId>> = vec![Vec::new(); count];
        let mut coordinators: Vec<ZoneId> = (0..count).collect();

        for zone_a in 0..count {
            let Some(node_a) = self.state.primary_node(zone_a) else {
                continue;
            };
            let info_a = match self.transport.get_group_info(&node_a).await {
                Ok(info) => info,
                Err(err) => {
                    log::warn!("[Topology] Group query failed for zone {}: {}", zone_a, err);
                    self.state.set_available(zone_a, false);
                    continue;
                }
            };

            for zone_b in 0..count {
                let Some(node_b) = self.state.primary_node(zone_b) else {
                    continue;
                };
                let info_b = match self.transport.get_group_info(&node_b).await {
                    Ok(info) => info,
                    Err(err) => {
                        log::warn!("[Topology] Group query failed for zone {}: {}", zone_b, err);
                        self.state.set_available(zone_b, false);
                        continue;
                    }
                };

                if info_b.member_nodes.iter().any(|m| *m == node_a) {
                    members[zone_a].push(zone_b);
                }
                if info_a.coordinator_node == node_b {
                    coordinators[zone_a] = zone_b;
                }
            }
        }

        GroupSnapshot {
            members,
            coordinators,
        }
    }

    /// Re-evaluates playback state for every group affected by a topology
    /// change, replaying each affected coordinator's last raw payload with
    /// the reconciliation flag set.
    async fn reconcile(&self, previous: &GroupSnapshot, current: &GroupSnapshot) {
        let mut affected: Vec<ZoneId> = Vec::new();
        for zone in 0..self.state.zone_count() {
            let membership_changed = previous.members.get(zone) != current.members.get(zone);
            let coordinator_changed =
                previous.coordinators.get(zone) != current.coordinators.get(zone);
            if membership_changed || coordinator_changed {
                let coordinator = current.coordinator_of(zone);
                if !affected.contains(&coordinator) {
                    affected.push(coordinator);
                }
            }
        }

        for coordinator in affected {
            let payload = self
                .state
                .record(coordinator)
                .lock()
                .last_transport_payload
                .clone();
            match payload {
                Some(payload) => {
                    self.playback
                        .apply_transport_event(coordinator, &payload, true)
                        .await;
                }
                None => {
                    log::debug!(
                        "[Topology] No transport payload yet for coordinator {}, skipping reconciliation",
                        coordinator
                    );
                }
            }
        }
    }
}
