//! Pull refreshes for the version-tracked resources: play queue, favorite
//! radios and the music database.
//!
//! The secondary scheduler tick calls [`LibraryService::run_dirty_refreshes`];
//! a counter is committed only after its refetch succeeds, so a failed fetch
//! leaves the resource dirty and retried on the next tick.

use std::sync::Arc;

use crate::events::{EventRegistry, ZoneValue};
use crate::state::{FleetState, MusicDbIndex};
use crate::zone::transport::{BrowseItem, MusicDbCategory, ZoneTransport};
use crate::zone::types::ZoneId;
use crate::zone::versions::ResourceKind;

/// Refreshes version-tracked resources and emits their change events.
pub struct LibraryService {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    transport: Arc<dyn ZoneTransport>,
    page_size: u32,
}

impl LibraryService {
    /// Creates a new LibraryService fetching ranges of `page_size` items.
    pub fn new(
        state: Arc<FleetState>,
        events: Arc<EventRegistry>,
        transport: Arc<dyn ZoneTransport>,
        page_size: u32,
    ) -> Self {
        Self {
            state,
            events,
            transport,
            page_size,
        }
    }

    /// Refetches every resource whose version counter is dirty, committing
    /// counters for the refreshes that succeeded.
    pub async fn run_dirty_refreshes(&self) {
        for zone in 0..self.state.zone_count() {
            let dirty: Vec<ResourceKind> = {
                let record = self.state.record(zone).lock();
                ResourceKind::ALL
                    .into_iter()
                    .filter(|kind| record.counters.is_dirty(*kind))
                    .collect()
            };

            for kind in dirty {
                let refreshed = match kind {
                    ResourceKind::Queue => self.refresh_queue(zone).await,
                    ResourceKind::Favorites => self.refresh_favorites(zone).await,
                    ResourceKind::MusicDb => self.refresh_music_db(zone).await,
                };

                if refreshed {
                    let mut record = self.state.record(zone).lock();
                    record.counters.commit(kind);
                    if kind == ResourceKind::Queue {
                        record.queue_refresh_pending = false;
                    }
                } else {
                    log::debug!(
                        "[Library] Refresh of {} for zone {} failed, staying dirty",
                        kind.as_str(),
                        zone
                    );
                }
            }
        }
    }

    /// Refetches the play queue in page-sized slices.
    ///
    /// Emits queue-updated when the title list changed, plus a track-index
    /// re-emission so observers can re-mark the current track against the
    /// new queue contents. Returns whether the fetch succeeded.
    pub async fn refresh_queue(&self, zone: ZoneId) -> bool {
        let Some(node) = self.state.primary_node(zone) else {
            return false;
        };

        // Queue-side play mode bookkeeping follows the playback state.
        {
            let mut record = self.state.record(zone).lock();
            if record.playback.play_mode != record.queue_play_mode {
                log::debug!(
                    "[Library] Zone {} queue play mode now {}",
                    zone,
                    record.playback.play_mode
                );
                record.queue_play_mode = record.playback.play_mode.clone();
            }
        }

        let first = match self.transport.get_queue_slice(&node, 0, self.page_size).await {
            Ok(slice) => slice,
            Err(err) => {
                log::warn!("[Library] Queue fetch failed for zone {}: {}", zone, err);
                return false;
            }
        };

        let total = first.total_size;
        let mut titles = first.titles;
        let mut start = self.page_size;
        while (titles.len() as u32) < total && start < total {
            match self.transport.get_queue_slice(&node, start, self.page_size).await {
                Ok(slice) => {
                    if slice.titles.is_empty() {
                        break;
                    }
                    titles.extend(slice.titles);
                    start += self.page_size;
                }
                Err(err) => {
                    log::warn!("[Library] Queue fetch failed for zone {}: {}", zone, err);
                    return false;
                }
            }
        }

        let (changed, track_index) = {
            let mut record = self.state.record(zone).lock();
            if record.queue_titles != titles {
                record.queue_titles = titles.clone();
                record.playback.queue_size = total;
                (true, record.playback.track_index)
            } else {
                (false, 0)
            }
        };

        if changed {
            log::info!("[Library] Zone {} queue updated ({} items)", zone, titles.len());
            self.events.queue_updated.emit(&ZoneValue::new(zone, titles));
            self.events
                .play_track_index_changed
                .emit(&ZoneValue::new(zone, track_index));
        } else {
            log::debug!("[Library] Zone {} queue unchanged", zone);
        }
        true
    }

    /// Refetches the favorite radio stations list.
    pub async fn refresh_favorites(&self, zone: ZoneId) -> bool {
        let Some(node) = self.state.primary_node(zone) else {
            return false;
        };
        let radios = match self.transport.get_favorite_radios(&node).await {
            Ok(radios) => radios,
            Err(err) => {
                log::warn!("[Library] Favorites fetch failed for zone {}: {}", zone, err);
                return false;
            }
        };

        let titles: Vec<String> = radios.into_iter().map(|r| r.title).collect();
        if self.state.set_favorites(titles.clone()) {
            log::info!("[Library] New favorite radios ({})", titles.len());
            self.events
                .favorites_changed
                .emit(&ZoneValue::new(zone, titles));
        } else {
            log::debug!("[Library] No new favorite radios");
        }
        true
    }

    /// Refetches the music-database browse index (artists, albums, genres).
    ///
    /// Artists are fetched in two ranges; the other categories fit one page.
    pub async fn refresh_music_db(&self, zone: ZoneId) -> bool {
        let Some(node) = self.state.primary_node(zone) else {
            return false;
        };

        let mut artists = match self.browse(&node, MusicDbCategory::Artists, 0).await {
            Some(items) => items,
            None => return false,
        };
        match self.browse(&node, MusicDbCategory::Artists, self.page_size).await {
            Some(more) => artists.extend(more),
            None => return false,
        }
        let albums = match self.browse(&node, MusicDbCategory::Albums, 0).await {
            Some(items) => items,
            None => return false,
        };
        let genres = match self.browse(&node, MusicDbCategory::Genres, 0).await {
            Some(items) => items,
            None => return false,
        };

        log::info!(
            "[Library] Music database refreshed: {} artists, {} albums, {} genres",
            artists.len(),
            albums.len(),
            genres.len()
        );
        self.state.set_music_db(MusicDbIndex {
            artists,
            albums,
            genres,
        });
        true
    }

    async fn browse(
        &self,
        node: &str,
        category: MusicDbCategory,
        start: u32,
    ) -> Option<Vec<BrowseItem>> {
        match self
            .transport
            .browse_music_db(node, category, start, self.page_size)
            .await
        {
            Ok(items) => Some(items),
            Err(err) => {
                log::warn!("[Library] Browse of {:?} failed: {}", category, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::zone::test_fixtures::MockTransport;
    use crate::zone::transport::FavoriteRadio;
    use crate::zone::types::ZoneConfig;

    struct Rig {
        state: Arc<FleetState>,
        events: Arc<EventRegistry>,
        transport: Arc<MockTransport>,
        library: LibraryService,
    }

    fn rig() -> Rig {
        let transport = Arc::new(MockTransport::new());
        transport.add_node("10.0.0.2", "Kitchen");

        let state = Arc::new(FleetState::new(&[ZoneConfig::single("10.0.0.2")]));
        state.set_available(0, true);

        let events = Arc::new(EventRegistry::new());
        let library = LibraryService::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport) as Arc<dyn ZoneTransport>,
            // Small page size so slicing is exercised without huge fixtures.
            3,
        );
        Rig {
            state,
            events,
            transport,
            library,
        }
    }

    #[tokio::test]
    async fn queue_refresh_slices_and_emits() {
        let rig = rig();
        let queue: Vec<String> = (1..=7).map(|i| format!("Track {i}")).collect();
        rig.transport
            .queues
            .lock()
            .insert("10.0.0.2".to_string(), queue.clone());

        let updates = Arc::new(Mutex::new(Vec::new()));
        let updates_clone = Arc::clone(&updates);
        rig.events
            .queue_updated
            .observe(move |ev| updates_clone.lock().push(ev.value.clone()));

        let indices = Arc::new(Mutex::new(Vec::new()));
        let indices_clone = Arc::clone(&indices);
        rig.events
            .play_track_index_changed
            .observe(move |ev| indices_clone.lock().push(ev.value));

        assert!(rig.library.refresh_queue(0).await);

        assert_eq!(updates.lock().clone(), vec![queue]);
        // Track index re-emitted alongside the new queue contents.
        assert_eq!(indices.lock().clone(), vec![0]);
        assert_eq!(rig.state.record(0).lock().playback.queue_size, 7);
    }

    #[tokio::test]
    async fn unchanged_queue_emits_nothing() {
        let rig = rig();
        rig.transport
            .queues
            .lock()
            .insert("10.0.0.2".to_string(), vec!["Track 1".to_string()]);

        assert!(rig.library.refresh_queue(0).await);

        let updates = Arc::new(Mutex::new(Vec::new()));
        let updates_clone = Arc::clone(&updates);
        rig.events
            .queue_updated
            .observe(move |ev| updates_clone.lock().push(ev.value.clone()));

        assert!(rig.library.refresh_queue(0).await);
        assert!(updates.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_leaves_counter_dirty() {
        let rig = rig();
        rig.state
            .record(0)
            .lock()
            .counters
            .observe(ResourceKind::Queue, "7");
        rig.transport.remove_node("10.0.0.2");
        rig.state.set_available(0, false);

        rig.library.run_dirty_refreshes().await;

        // Fetch failed: counter must stay dirty so the next tick retries.
        assert!(rig
            .state
            .record(0)
            .lock()
            .counters
            .is_dirty(ResourceKind::Queue));
    }

    #[tokio::test]
    async fn successful_refresh_commits_and_clears_pending() {
        let rig = rig();
        {
            let mut record = rig.state.record(0).lock();
            record.counters.observe(ResourceKind::Queue, "7");
            record.queue_refresh_pending = true;
        }

        rig.library.run_dirty_refreshes().await;

        let record = rig.state.record(0).lock();
        assert!(!record.counters.is_dirty(ResourceKind::Queue));
        assert!(!record.queue_refresh_pending);
    }

    #[tokio::test]
    async fn favorites_diff_and_emit() {
        let rig = rig();
        *rig.transport.favorites.lock() = vec![
            FavoriteRadio {
                title: "WDR 2".to_string(),
                uri: "x-sonosapi-stream:s1".to_string(),
            },
            FavoriteRadio {
                title: "1LIVE".to_string(),
                uri: "x-sonosapi-stream:s2".to_string(),
            },
        ];

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        rig.events
            .favorites_changed
            .observe(move |ev| seen_clone.lock().push(ev.value.clone()));

        assert!(rig.library.refresh_favorites(0).await);
        assert!(rig.library.refresh_favorites(0).await);

        // Second refresh found no change, so only one emission.
        assert_eq!(
            seen.lock().clone(),
            vec![vec!["WDR 2".to_string(), "1LIVE".to_string()]]
        );
        assert_eq!(rig.state.favorites(), vec!["WDR 2", "1LIVE"]);
    }

    #[tokio::test]
    async fn music_db_refresh_fills_index() {
        let rig = rig();
        {
            let mut browse = rig.transport.browse_items.lock();
            browse.insert(
                MusicDbCategory::Artists,
                (1..=5)
                    .map(|i| BrowseItem {
                        title: format!("Artist {i}"),
                        item_id: format!("A:{i}"),
                    })
                    .collect(),
            );
            browse.insert(
                MusicDbCategory::Albums,
                vec![BrowseItem {
                    title: "Album".to_string(),
                    item_id: "B:1".to_string(),
                }],
            );
        }

        assert!(rig.library.refresh_music_db(0).await);

        let index = rig.state.music_db();
        // Both artist ranges collected (page size 3: 3 + 2).
        assert_eq!(index.artists.len(), 5);
        assert_eq!(index.albums.len(), 1);
        assert!(index.genres.is_empty());
    }
}
