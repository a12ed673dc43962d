//! The command surface exposed to external callers.
//!
//! Commands are synchronous round trips to the transport adapter and may
//! block the calling context; they never block the scheduler's ticks for
//! other zones. Commands that provoke self-inflicted device notifications
//! (queue removal, group recoordination) hold the zone's suppression window
//! open for the full duration of the round trip.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::state::FleetState;
use crate::zone::record::{SuppressionGuard, SuppressionKind};
use crate::zone::transport::{MusicDbCategory, ZoneTransport};
use crate::zone::types::{TransportState, ZoneId};

use super::line_in::LineInService;
use super::volume::{BalanceAction, VolumeAction, VolumeService};

/// Group mutation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    /// `zone` joins the group coordinated by `target`.
    Join,
    /// `zone` leaves its group.
    Unjoin,
    /// `target` becomes the coordinator of `zone`'s group.
    Recoordinate,
}

/// Playback start/stop actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    /// Read the live transport state and invert it.
    Toggle,
    Play,
    Pause,
}

/// Track skip direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDirection {
    Next,
    Previous,
}

/// How to pick a favorite radio station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioSelector {
    Name(String),
    Index(usize),
}

/// Which queue entries to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSelection {
    Indices(Vec<u32>),
    ClearAll,
}

/// Sleep-timer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTimerAction {
    Minutes(u32),
    Cancel,
}

/// Supported play modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Normal,
    ShuffleNoRepeat,
}

impl PlayMode {
    /// Device-level play mode string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::ShuffleNoRepeat => "SHUFFLE_NOREPEAT",
        }
    }
}

/// Executes caller commands against the fleet.
pub struct CommandSurface {
    state: Arc<FleetState>,
    transport: Arc<dyn ZoneTransport>,
    volume: Arc<VolumeService>,
    line_in: Arc<LineInService>,
}

impl CommandSurface {
    /// Creates a new CommandSurface.
    pub fn new(
        state: Arc<FleetState>,
        transport: Arc<dyn ZoneTransport>,
        volume: Arc<VolumeService>,
        line_in: Arc<LineInService>,
    ) -> Self {
        Self {
            state,
            transport,
            volume,
            line_in,
        }
    }

    fn require_node(&self, zone: ZoneId) -> EngineResult<String> {
        if zone >= self.state.zone_count() {
            return Err(EngineError::UnknownZone(zone));
        }
        self.state
            .primary_node(zone)
            .ok_or(EngineError::ZoneUnavailable(zone))
    }

    /// Node of the zone's group coordinator; playback commands go there.
    fn require_coordinator_node(&self, zone: ZoneId) -> EngineResult<(ZoneId, String)> {
        if zone >= self.state.zone_count() {
            return Err(EngineError::UnknownZone(zone));
        }
        let coordinator = self.state.coordinator_of(zone);
        let node = self
            .state
            .primary_node(coordinator)
            .ok_or(EngineError::ZoneUnavailable(coordinator))?;
        Ok((coordinator, node))
    }

    /// Mutates the fleet's group structure.
    pub async fn set_group(
        &self,
        action: GroupAction,
        zone: ZoneId,
        target: ZoneId,
    ) -> EngineResult<()> {
        match action {
            GroupAction::Join => {
                let node = self.require_node(zone)?;
                let target_node = self.require_node(target)?;
                self.transport.join_group(&node, &target_node).await?;
                Ok(())
            }
            GroupAction::Unjoin => {
                let node = self.require_node(zone)?;
                self.transport.unjoin(&node).await?;
                Ok(())
            }
            GroupAction::Recoordinate => self.recoordinate(zone, target).await,
        }
    }

    /// Makes `target` the coordinator of `zone`'s group: the current
    /// coordinator unjoins and rejoins behind the target. Selected-track
    /// emission is suppressed for every group member while the device
    /// reshuffles itself.
    async fn recoordinate(&self, zone: ZoneId, target: ZoneId) -> EngineResult<()> {
        let members = self.state.members_of(zone);
        if !members.contains(&target) {
            return Err(EngineError::InvalidRequest(format!(
                "zone {target} is not a member of zone {zone}'s group"
            )));
        }
        let current = self.state.coordinator_of(zone);
        if current == target {
            return Ok(());
        }

        let coordinator_node = self.require_node(current)?;
        let target_node = self.require_node(target)?;

        let _guards: Vec<SuppressionGuard<'_>> = members
            .iter()
            .map(|&member| {
                SuppressionGuard::new(
                    self.state.suppression(member),
                    SuppressionKind::Recoordination,
                )
            })
            .collect();

        log::info!(
            "[Commands] Recoordinating group of zone {}: {} -> {}",
            zone,
            current,
            target
        );
        self.transport.unjoin(&coordinator_node).await?;
        self.transport
            .join_group(&coordinator_node, &target_node)
            .await?;
        Ok(())
    }

    /// Executes a volume command.
    pub async fn set_volume(&self, zone: ZoneId, action: VolumeAction) -> EngineResult<()> {
        self.volume.set_volume(zone, action).await
    }

    /// Executes a balance command.
    pub async fn set_balance(
        &self,
        zone: ZoneId,
        action: BalanceAction,
        step: u8,
    ) -> EngineResult<()> {
        self.volume.set_balance(zone, action, step).await
    }

    /// Starts, stops or toggles playback on the zone's coordinator.
    pub async fn set_play_state(&self, zone: ZoneId, action: PlayAction) -> EngineResult<()> {
        let (_, node) = self.require_coordinator_node(zone)?;
        match action {
            PlayAction::Play => self.transport.play(&node).await?,
            PlayAction::Pause => self.transport.pause(&node).await?,
            PlayAction::Toggle => match self.transport.get_transport_info(&node).await? {
                TransportState::Playing => self.transport.pause(&node).await?,
                TransportState::Transitioning => {
                    log::warn!(
                        "[Commands] Zone {} is in transition, play toggle deferred",
                        zone
                    );
                    return Err(EngineError::DeviceBusy("TRANSITIONING".to_string()));
                }
                _ => self.transport.play(&node).await?,
            },
        }
        Ok(())
    }

    /// Skips to the next or previous track on the zone's coordinator.
    pub async fn set_track(&self, zone: ZoneId, direction: TrackDirection) -> EngineResult<()> {
        let (_, node) = self.require_coordinator_node(zone)?;
        match direction {
            TrackDirection::Next => self.transport.next_track(&node).await?,
            TrackDirection::Previous => self.transport.previous_track(&node).await?,
        }
        Ok(())
    }

    /// Plays a favorite radio station on the zone's coordinator.
    pub async fn set_radio(&self, zone: ZoneId, selector: RadioSelector) -> EngineResult<()> {
        let (_, node) = self.require_coordinator_node(zone)?;
        let radios = self.transport.get_favorite_radios(&node).await?;

        let radio = match &selector {
            RadioSelector::Index(index) => radios.get(*index).ok_or_else(|| {
                EngineError::InvalidRequest(format!("no favorite radio at index {index}"))
            })?,
            RadioSelector::Name(name) => radios
                .iter()
                .find(|r| r.title == *name)
                .ok_or_else(|| EngineError::InvalidRequest(format!("unknown favorite '{name}'")))?,
        };

        // Station titles can carry markup the device display chokes on.
        let title: String = radio
            .title
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ')
            .collect();
        log::info!("[Commands] Zone {} plays radio '{}'", zone, title);
        self.transport.play_uri(&node, &radio.uri, &title).await?;
        Ok(())
    }

    /// Starts playback from a queue position.
    pub async fn set_queue_track(&self, zone: ZoneId, index: u32) -> EngineResult<()> {
        let node = self.require_node(zone)?;
        log::debug!("[Commands] Zone {} plays queue position {}", zone, index);
        self.transport.play_from_queue(&node, index).await?;
        Ok(())
    }

    /// Removes queue entries, holding the queue suppression window open for
    /// the whole round trip so the device's own removal notifications are
    /// not surfaced as queue changes.
    pub async fn remove_queue_items(
        &self,
        zone: ZoneId,
        selection: QueueSelection,
    ) -> EngineResult<()> {
        let node = self.require_node(zone)?;
        let _guard =
            SuppressionGuard::new(self.state.suppression(zone), SuppressionKind::QueueRemoval);

        match selection {
            QueueSelection::ClearAll => {
                self.transport.clear_queue(&node).await?;
            }
            QueueSelection::Indices(mut indices) => {
                // Remove back-to-front so earlier removals don't shift the
                // positions still pending.
                indices.sort_unstable_by(|a, b| b.cmp(a));
                indices.dedup();
                for index in indices {
                    self.transport.remove_from_queue(&node, index).await?;
                }
            }
        }
        Ok(())
    }

    /// Sets or cancels the sleep timer on the zone's coordinator.
    pub async fn set_sleep_timer(&self, zone: ZoneId, action: SleepTimerAction) -> EngineResult<()> {
        let (_, node) = self.require_coordinator_node(zone)?;
        let seconds = match action {
            SleepTimerAction::Minutes(minutes) => Some(u64::from(minutes) * 60),
            SleepTimerAction::Cancel => None,
        };
        self.transport.set_sleep_timer(&node, seconds).await?;
        Ok(())
    }

    /// Sets the play mode on the zone's coordinator. Refused with a logged
    /// notice while the coordinator plays radio or line-in, where queue
    /// play modes have no meaning.
    pub async fn set_play_mode(&self, zone: ZoneId, mode: PlayMode) -> EngineResult<()> {
        let (coordinator, node) = self.require_coordinator_node(zone)?;
        if self
            .state
            .record(coordinator)
            .lock()
            .playback
            .source
            .is_external()
        {
            log::info!(
                "[Commands] Zone {} plays radio/line-in, ignoring play mode change",
                zone
            );
            return Ok(());
        }
        self.transport.set_play_mode(&node, mode.as_str()).await?;
        Ok(())
    }

    /// Appends a music-database browse item to the zone's queue.
    pub async fn add_queue_item(
        &self,
        zone: ZoneId,
        category: MusicDbCategory,
        index: usize,
    ) -> EngineResult<()> {
        let node = self.require_node(zone)?;
        let db = self.state.music_db();
        let items = match category {
            MusicDbCategory::Artists => &db.artists,
            MusicDbCategory::Albums => &db.albums,
            MusicDbCategory::Genres => &db.genres,
            MusicDbCategory::Tracks => {
                return Err(EngineError::InvalidRequest(
                    "track browse results are not cached".to_string(),
                ))
            }
        };
        let item = items.get(index).ok_or_else(|| {
            EngineError::InvalidRequest(format!("no {category:?} item at index {index}"))
        })?;
        self.transport.add_to_queue(&node, &item.item_id).await?;
        Ok(())
    }

    /// Switches a zone to a discovered line-in source and starts playback.
    pub async fn set_aux_play(&self, zone: ZoneId, aux_index: usize) -> EngineResult<()> {
        self.line_in.play_aux(zone, aux_index).await
    }
}
