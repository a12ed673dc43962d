//! Shared test fixtures: a scripted in-memory transport.
//!
//! `MockTransport` answers every [`ZoneTransport`] call from plain maps so
//! service tests can script device behavior and assert on the command log.
//! Nodes absent from the `speakers` map act unreachable on every call.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;

use super::notification::{Notification, NotificationChannel};
use super::transport::{
    AudioChannel, BrowseItem, FavoriteRadio, GroupInfo, LineInAttributes, MusicDbCategory,
    QueueSlice, SpeakerInfo, SubscriptionHandle, TrackInfo, TransportError, TransportResult,
    ZoneTransport,
};
use super::types::TransportState;

/// Scripted transport double.
#[derive(Default)]
pub(crate) struct MockTransport {
    pub speakers: DashMap<String, SpeakerInfo>,
    pub group_infos: DashMap<String, GroupInfo>,
    pub transport_states: DashMap<String, TransportState>,
    pub track_infos: DashMap<String, TrackInfo>,
    pub line_in_active: DashMap<String, bool>,
    pub line_in_attrs: DashMap<String, LineInAttributes>,
    pub volumes: DashMap<String, u8>,
    pub channel_volumes: DashMap<(String, AudioChannel), u8>,
    pub sleep_timers: DashMap<String, Option<u64>>,
    pub queues: Mutex<HashMap<String, Vec<String>>>,
    pub favorites: Mutex<Vec<FavoriteRadio>>,
    pub browse_items: Mutex<HashMap<MusicDbCategory, Vec<BrowseItem>>>,
    /// Command names that should fail with `Rejected`.
    pub failing_commands: DashSet<&'static str>,
    /// Everything the engine issued, in order.
    commands: Mutex<Vec<String>>,
    pending: Mutex<HashMap<(String, NotificationChannel), VecDeque<Notification>>>,
    sid_index: DashMap<String, (String, NotificationChannel)>,
    sid_counter: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reachable node with a speaker name.
    pub fn add_node(&self, node: &str, name: &str) {
        self.speakers.insert(
            node.to_string(),
            SpeakerInfo {
                name: name.to_string(),
                model: "Test One".to_string(),
            },
        );
    }

    /// Makes a node unreachable for every subsequent call.
    pub fn remove_node(&self, node: &str) {
        self.speakers.remove(node);
    }

    /// Scripts the group `members` (first member coordinates) onto every
    /// member's own group-info answer.
    pub fn script_group(&self, members: &[&str]) {
        let info = GroupInfo {
            member_nodes: members.iter().map(|m| m.to_string()).collect(),
            coordinator_node: members[0].to_string(),
        };
        for member in members {
            self.group_infos.insert(member.to_string(), info.clone());
        }
    }

    /// Queues a notification for the next poll on `(node, channel)`.
    pub fn push_notification(
        &self,
        node: &str,
        channel: NotificationChannel,
        notification: Notification,
    ) {
        self.pending
            .lock()
            .entry((node.to_string(), channel))
            .or_default()
            .push_back(notification);
    }

    /// Snapshot of the issued command log.
    pub fn issued_commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Invalidates every subscription, as a rebooting device would.
    pub fn lapse_all_subscriptions(&self) {
        self.sid_index.clear();
    }

    fn record(&self, line: String) {
        self.commands.lock().push(line);
    }

    fn ensure_reachable(&self, node: &str) -> TransportResult<()> {
        if self.speakers.contains_key(node) {
            Ok(())
        } else {
            Err(TransportError::Unreachable(node.to_string()))
        }
    }

    fn check_command(&self, name: &'static str) -> TransportResult<()> {
        if self.failing_commands.contains(name) {
            Err(TransportError::Rejected(format!("{name} scripted to fail")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ZoneTransport for MockTransport {
    async fn get_speaker_info(&self, node: &str) -> TransportResult<SpeakerInfo> {
        self.speakers
            .get(node)
            .map(|entry| entry.clone())
            .ok_or_else(|| TransportError::Unreachable(node.to_string()))
    }

    async fn get_group_info(&self, node: &str) -> TransportResult<GroupInfo> {
        self.ensure_reachable(node)?;
        Ok(self
            .group_infos
            .get(node)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| GroupInfo {
                member_nodes: vec![node.to_string()],
                coordinator_node: node.to_string(),
            }))
    }

    async fn join_group(&self, node: &str, target: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.check_command("join")?;
        self.record(format!("join {node} -> {target}"));

        // Mirror what the real fleet does: the target's group absorbs the node.
        let mut info = self
            .group_infos
            .get(target)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| GroupInfo {
                member_nodes: vec![target.to_string()],
                coordinator_node: target.to_string(),
            });
        if !info.member_nodes.iter().any(|m| m == node) {
            info.member_nodes.push(node.to_string());
        }
        for member in &info.member_nodes {
            self.group_infos.insert(member.clone(), info.clone());
        }
        Ok(())
    }

    async fn unjoin(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.check_command("unjoin")?;
        self.record(format!("unjoin {node}"));

        if let Some(mut info) = self.group_infos.get(node).map(|entry| entry.clone()) {
            info.member_nodes.retain(|m| m != node);
            if info.coordinator_node == node {
                if let Some(next) = info.member_nodes.first() {
                    info.coordinator_node = next.clone();
                }
            }
            for member in &info.member_nodes {
                self.group_infos.insert(member.clone(), info.clone());
            }
        }
        self.group_infos.insert(
            node.to_string(),
            GroupInfo {
                member_nodes: vec![node.to_string()],
                coordinator_node: node.to_string(),
            },
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        node: &str,
        channel: NotificationChannel,
    ) -> TransportResult<SubscriptionHandle> {
        self.ensure_reachable(node)
            .map_err(|_| TransportError::Subscription(format!("{node} unreachable")))?;
        let sid = format!(
            "uuid:{}:{}:{}",
            node,
            channel.as_str(),
            self.sid_counter.fetch_add(1, Ordering::SeqCst)
        );
        self.sid_index
            .insert(sid.clone(), (node.to_string(), channel));
        Ok(SubscriptionHandle { sid })
    }

    async fn is_subscription_active(&self, handle: &SubscriptionHandle) -> bool {
        self.sid_index.contains_key(&handle.sid)
    }

    async fn poll_notification(
        &self,
        handle: &SubscriptionHandle,
        _timeout: Duration,
    ) -> TransportResult<Option<Notification>> {
        let (node, channel) = self
            .sid_index
            .get(&handle.sid)
            .map(|entry| entry.clone())
            .ok_or_else(|| TransportError::Subscription("lapsed".to_string()))?;
        Ok(self
            .pending
            .lock()
            .get_mut(&(node, channel))
            .and_then(VecDeque::pop_front))
    }

    async fn get_transport_info(&self, node: &str) -> TransportResult<TransportState> {
        self.ensure_reachable(node)?;
        Ok(self
            .transport_states
            .get(node)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn get_current_track_info(&self, node: &str) -> TransportResult<TrackInfo> {
        self.ensure_reachable(node)?;
        Ok(self
            .track_infos
            .get(node)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn is_playing_line_in(&self, node: &str) -> TransportResult<bool> {
        self.ensure_reachable(node)?;
        Ok(self
            .line_in_active
            .get(node)
            .map(|entry| *entry)
            .unwrap_or(false))
    }

    async fn play(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.check_command("play")?;
        self.record(format!("play {node}"));
        Ok(())
    }

    async fn pause(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.check_command("pause")?;
        self.record(format!("pause {node}"));
        Ok(())
    }

    async fn next_track(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("next {node}"));
        Ok(())
    }

    async fn previous_track(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("previous {node}"));
        Ok(())
    }

    async fn play_uri(&self, node: &str, uri: &str, title: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("play_uri {node} {uri} [{title}]"));
        Ok(())
    }

    async fn play_from_queue(&self, node: &str, index: u32) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("play_from_queue {node} {index}"));
        Ok(())
    }

    async fn set_play_mode(&self, node: &str, mode: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("set_play_mode {node} {mode}"));
        Ok(())
    }

    async fn switch_to_line_in(&self, node: &str, source_node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.record(format!("switch_to_line_in {node} {source_node}"));
        Ok(())
    }

    async fn get_line_in_attributes(&self, node: &str) -> TransportResult<LineInAttributes> {
        self.ensure_reachable(node)?;
        Ok(self
            .line_in_attrs
            .get(node)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn get_volume(&self, node: &str) -> TransportResult<u8> {
        self.ensure_reachable(node)?;
        Ok(self.volumes.get(node).map(|entry| *entry).unwrap_or(0))
    }

    async fn set_volume(&self, node: &str, volume: u8) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.volumes.insert(node.to_string(), volume);
        self.record(format!("set_volume {node} {volume}"));
        Ok(())
    }

    async fn get_channel_volume(&self, node: &str, channel: AudioChannel) -> TransportResult<u8> {
        self.ensure_reachable(node)?;
        Ok(self
            .channel_volumes
            .get(&(node.to_string(), channel))
            .map(|entry| *entry)
            .unwrap_or(100))
    }

    async fn set_channel_volume(
        &self,
        node: &str,
        channel: AudioChannel,
        volume: u8,
    ) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.channel_volumes
            .insert((node.to_string(), channel), volume);
        self.record(format!(
            "set_channel_volume {node} {} {volume}",
            channel.as_str()
        ));
        Ok(())
    }

    async fn get_sleep_timer(&self, node: &str) -> TransportResult<Option<u64>> {
        self.ensure_reachable(node)?;
        Ok(self
            .sleep_timers
            .get(node)
            .map(|entry| *entry)
            .unwrap_or(None))
    }

    async fn set_sleep_timer(&self, node: &str, seconds: Option<u64>) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.sleep_timers.insert(node.to_string(), seconds);
        self.record(format!("set_sleep_timer {node} {seconds:?}"));
        Ok(())
    }

    async fn get_favorite_radios(&self, node: &str) -> TransportResult<Vec<FavoriteRadio>> {
        self.ensure_reachable(node)?;
        Ok(self.favorites.lock().clone())
    }

    async fn browse_music_db(
        &self,
        node: &str,
        category: MusicDbCategory,
        start: u32,
        count: u32,
    ) -> TransportResult<Vec<BrowseItem>> {
        self.ensure_reachable(node)?;
        let items = self.browse_items.lock();
        let all = items.get(&category).cloned().unwrap_or_default();
        Ok(all
            .into_iter()
            .skip(start as usize)
            .take(count as usize)
            .collect())
    }

    async fn get_queue_slice(
        &self,
        node: &str,
        start: u32,
        count: u32,
    ) -> TransportResult<QueueSlice> {
        self.ensure_reachable(node)?;
        let queues = self.queues.lock();
        let queue = queues.get(node).cloned().unwrap_or_default();
        Ok(QueueSlice {
            total_size: queue.len() as u32,
            titles: queue
                .into_iter()
                .skip(start as usize)
                .take(count as usize)
                .collect(),
        })
    }

    async fn add_to_queue(&self, node: &str, item_id: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.queues
            .lock()
            .entry(node.to_string())
            .or_default()
            .push(item_id.to_string());
        self.record(format!("add_to_queue {node} {item_id}"));
        Ok(())
    }

    async fn remove_from_queue(&self, node: &str, index: u32) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.check_command("remove_from_queue")?;
        let mut queues = self.queues.lock();
        if let Some(queue) = queues.get_mut(node) {
            if (index as usize) < queue.len() {
                queue.remove(index as usize);
            }
        }
        drop(queues);
        self.record(format!("remove_from_queue {node} {index}"));
        Ok(())
    }

    async fn clear_queue(&self, node: &str) -> TransportResult<()> {
        self.ensure_reachable(node)?;
        self.queues.lock().remove(node);
        self.record(format!("clear_queue {node}"));
        Ok(())
    }
}

/// Transport payload fixture: a music-database track event.
pub(crate) fn music_db_payload(
    title: &str,
    track_index: &str,
) -> super::notification::TransportEventPayload {
    super::notification::TransportEventPayload {
        transport_state: "PLAYING".to_string(),
        transport_status: "OK".to_string(),
        current_track_meta_title: title.to_string(),
        enqueued_uri: "x-rincon-queue:RINCON_TEST#0".to_string(),
        enqueued_meta_title: title.to_string(),
        current_track_index: track_index.to_string(),
        play_mode: "NORMAL".to_string(),
        sleep_timer_generation: None,
    }
}

/// Transport payload fixture: a radio stream event.
pub(crate) fn radio_payload(station: &str) -> super::notification::TransportEventPayload {
    super::notification::TransportEventPayload {
        transport_state: "PLAYING".to_string(),
        transport_status: "OK".to_string(),
        current_track_meta_title: station.to_string(),
        enqueued_uri: "x-sonosapi-stream:s12345?sid=254".to_string(),
        enqueued_meta_title: station.to_string(),
        current_track_index: "1".to_string(),
        play_mode: "NORMAL".to_string(),
        sleep_timer_generation: None,
    }
}
