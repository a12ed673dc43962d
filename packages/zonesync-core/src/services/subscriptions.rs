//! Event subscription lifecycle and notification processing.
//!
//! [`SubscriptionLifecycle`] keeps one subscription per zone and channel,
//! re-establishing lazily whenever a subscription is absent or has lapsed.
//! [`NotificationProcessor`] drains one queued notification per zone/channel
//! each primary tick and routes it to the owning service. Every failure on
//! this path degrades to "no notification this cycle" for that zone/channel
//! and never prevents the rest of the fleet from being processed.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::state::FleetState;
use crate::zone::notification::{ContentUpdateStamps, Notification, NotificationChannel};
use crate::zone::transport::{SubscriptionHandle, ZoneTransport};
use crate::zone::types::ZoneId;
use crate::zone::versions::ResourceKind;

use super::playback::PlaybackSynchronizer;
use super::sleep_timer::SleepTimerService;
use super::volume::VolumeService;

/// Maintains per-zone, per-channel subscriptions.
pub struct SubscriptionLifecycle {
    transport: Arc<dyn ZoneTransport>,
    subscriptions: DashMap<(ZoneId, NotificationChannel), SubscriptionHandle>,
    poll_timeout: Duration,
}

impl SubscriptionLifecycle {
    /// Creates a new lifecycle with the given bounded poll wait.
    pub fn new(transport: Arc<dyn ZoneTransport>, poll_timeout: Duration) -> Self {
        Self {
            transport,
            subscriptions: DashMap::new(),
            poll_timeout,
        }
    }

    /// Ensures an active subscription for `(zone, channel)`, re-subscribing
    /// when the previous one lapsed. Returns `None` on failure; the next
    /// tick retries.
    pub async fn ensure_subscribed(
        &self,
        zone: ZoneId,
        node: &str,
        channel: NotificationChannel,
    ) -> Option<SubscriptionHandle> {
        let key = (zone, channel);
        if let Some(handle) = self.subscriptions.get(&key).map(|entry| entry.clone()) {
            if self.transport.is_subscription_active(&handle).await {
                return Some(handle);
            }
            log::debug!(
                "[Subscriptions] Zone {} {} subscription lapsed",
                zone,
                channel.as_str()
            );
            self.subscriptions.remove(&key);
        }

        match self.transport.subscribe(node, channel).await {
            Ok(handle) => {
                log::debug!(
                    "[Subscriptions] Zone {} subscribed to {}",
                    zone,
                    channel.as_str()
                );
                self.subscriptions.insert(key, handle.clone());
                Some(handle)
            }
            Err(err) => {
                log::debug!(
                    "[Subscriptions] Zone {} subscribe to {} failed: {}",
                    zone,
                    channel.as_str(),
                    err
                );
                None
            }
        }
    }

    /// Performs a bounded-wait poll for one queued notification.
    ///
    /// Subscribe or poll failures are treated as "no notification this
    /// cycle"; a failed poll also drops the handle so the next cycle
    /// re-subscribes.
    pub async fn poll_once(
        &self,
        zone: ZoneId,
        node: &str,
        channel: NotificationChannel,
    ) -> Option<Notification> {
        let handle = self.ensure_subscribed(zone, node, channel).await?;
        match self
            .transport
            .poll_notification(&handle, self.poll_timeout)
            .await
        {
            Ok(notification) => notification,
            Err(err) => {
                log::debug!(
                    "[Subscriptions] Zone {} poll on {} failed: {}",
                    zone,
                    channel.as_str(),
                    err
                );
                self.subscriptions.remove(&(zone, channel));
                None
            }
        }
    }
}

/// Routes drained notifications into the engine's services.
pub struct NotificationProcessor {
    state: Arc<FleetState>,
    lifecycle: Arc<SubscriptionLifecycle>,
    playback: Arc<PlaybackSynchronizer>,
    volume: Arc<VolumeService>,
    sleep: Arc<SleepTimerService>,
}

impl NotificationProcessor {
    /// Creates a new NotificationProcessor.
    pub fn new(
        state: Arc<FleetState>,
        lifecycle: Arc<SubscriptionLifecycle>,
        playback: Arc<PlaybackSynchronizer>,
        volume: Arc<VolumeService>,
        sleep: Arc<SleepTimerService>,
    ) -> Self {
        Self {
            state,
            lifecycle,
            playback,
            volume,
            sleep,
        }
    }

    /// Drains at most one notification per channel for every available zone.
    pub async fn poll_all(&self) {
        for zone in 0..self.state.zone_count() {
            let Some(node) = self.state.primary_node(zone) else {
                continue;
            };
            for channel in NotificationChannel::ALL {
                if let Some(notification) = self.lifecycle.poll_once(zone, &node, channel).await {
                    self.process(zone, notification).await;
                }
            }
        }
    }

    /// Routes one notification.
    pub async fn process(&self, zone: ZoneId, notification: Notification) {
        match notification {
            Notification::Rendering => {
                log::debug!("[Subscriptions] Zone {} rendering change", zone);
                self.volume.sample_volumes(false).await;
                self.volume.sample_balances(false).await;
            }
            Notification::ContentDirectory(stamps) => {
                self.observe_stamps(zone, &stamps);
            }
            Notification::Transport(payload) => {
                if let Some(generation) = &payload.sleep_timer_generation {
                    log::debug!(
                        "[Subscriptions] Zone {} sleep timer generation {}",
                        zone,
                        generation
                    );
                    self.sleep.refresh_zone(zone).await;
                }
                if payload.has_transport_state() {
                    self.state.record(zone).lock().last_transport_payload = Some(payload.clone());
                    self.playback.apply_transport_event(zone, &payload, false).await;
                }
            }
            Notification::Topology => {
                // The primary tick refreshes topology right after the poll
                // pass, picking this up without a dedicated fast path.
                log::debug!("[Subscriptions] Zone {} topology change notice", zone);
            }
            Notification::DeviceProperties => {
                tracing::debug!(zone, "device properties change");
            }
        }
    }

    /// Records content-directory version stamps into the zone's counters.
    ///
    /// Queue stamps are ignored while the zone's queue-removal suppression
    /// window is open, so self-inflicted removal notifications never turn
    /// into refreshes.
    fn observe_stamps(&self, zone: ZoneId, stamps: &ContentUpdateStamps) {
        let mut record = self.state.record(zone).lock();

        if let Some(stamp) = &stamps.container_update_ids {
            if self.state.suppression(zone).queue_removal_active() {
                log::debug!(
                    "[Subscriptions] Zone {} queue stamp {} suppressed (removal in flight)",
                    zone,
                    stamp
                );
            } else if record.counters.observe(ResourceKind::Queue, stamp) {
                log::debug!("[Subscriptions] Zone {} queue stamp {}", zone, stamp);
                record.queue_refresh_pending = true;
            }
        }

        if let Some(stamp) = &stamps.favorites_update_id {
            if record.counters.observe(ResourceKind::Favorites, stamp) {
                log::debug!("[Subscriptions] Zone {} favorites stamp {}", zone, stamp);
            }
        }

        if let Some(stamp) = &stamps.share_list_update_id {
            if record.counters.observe(ResourceKind::MusicDb, stamp) {
                log::debug!("[Subscriptions] Zone {} music-db stamp {}", zone, stamp);
            }
        }
    }
}
