//! Engine composition root.
//!
//! [`Engine::new`] is the single place where the services are instantiated
//! and wired together; [`Engine::start`] performs the initial topology
//! probe and hands the periodic work to the cyclic scheduler. The engine
//! keeps running until [`Engine::shutdown`] cancels the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};
use crate::events::EventRegistry;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::{
    CommandSurface, CyclicScheduler, LibraryService, LineInService, NotificationProcessor,
    PlaybackSynchronizer, SleepTimerService, SubscriptionLifecycle, TopologyManager, VolumeService,
};
use crate::state::{Config, FleetState};
use crate::zone::types::ZoneConfig;
use crate::zone::ZoneTransport;

/// The zone topology and playback state synchronization engine.
///
/// Owns the fleet state, the observer registry and the services; external
/// callers register observers via [`Engine::events`] and issue commands via
/// [`Engine::commands`].
pub struct Engine {
    state: Arc<FleetState>,
    events: Arc<EventRegistry>,
    commands: Arc<CommandSurface>,
    topology: Arc<TopologyManager>,
    scheduler: Arc<CyclicScheduler>,
    #[cfg(test)]
    processor: Arc<NotificationProcessor>,
}

impl Engine {
    /// Wires the engine for the given fleet.
    ///
    /// Zones are enumerated once from `zones`; availability is established
    /// by the first topology refresh in [`Engine::start`].
    pub fn new(
        config: Config,
        zones: &[ZoneConfig],
        transport: Arc<dyn ZoneTransport>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::InvalidRequest)?;

        let state = Arc::new(FleetState::new(zones));
        let events = Arc::new(EventRegistry::new());
        let cancel = CancellationToken::new();

        let playback = Arc::new(PlaybackSynchronizer::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport),
        ));
        let topology = Arc::new(TopologyManager::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport),
            Arc::clone(&playback),
        ));
        let lifecycle = Arc::new(SubscriptionLifecycle::new(
            Arc::clone(&transport),
            Duration::from_millis(config.poll_timeout_ms),
        ));
        let volume = Arc::new(VolumeService::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport),
        ));
        let sleep = Arc::new(SleepTimerService::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport),
        ));
        let processor = Arc::new(NotificationProcessor::new(
            Arc::clone(&state),
            lifecycle,
            Arc::clone(&playback),
            Arc::clone(&volume),
            Arc::clone(&sleep),
        ));
        let library = Arc::new(LibraryService::new(
            Arc::clone(&state),
            Arc::clone(&events),
            Arc::clone(&transport),
            config.browse_page_size,
        ));
        let line_in = Arc::new(LineInService::new(
            Arc::clone(&state),
            Arc::clone(&transport),
        ));
        let commands = Arc::new(CommandSurface::new(
            Arc::clone(&state),
            Arc::clone(&transport),
            Arc::clone(&volume),
            Arc::clone(&line_in),
        ));

        let scheduler = Arc::new(CyclicScheduler::new(
            config,
            Arc::clone(&topology),
            Arc::clone(&processor),
            library,
            volume,
            sleep,
            line_in,
            cancel,
        ));

        Ok(Self {
            state,
            events,
            commands,
            topology,
            scheduler,
            #[cfg(test)]
            processor,
        })
    }

    /// The observer registry. Register handlers here, before or after start.
    #[must_use]
    pub fn events(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    /// The shared fleet state, for read-side queries.
    #[must_use]
    pub fn state(&self) -> &Arc<FleetState> {
        &self.state
    }

    /// The command surface.
    #[must_use]
    pub fn commands(&self) -> &Arc<CommandSurface> {
        &self.commands
    }

    /// Probes the fleet once and starts the cyclic scheduler on the current
    /// Tokio runtime.
    pub async fn start(&self) -> EngineResult<()> {
        self.start_with(&TokioSpawner::current()).await
    }

    /// Probes the fleet once and starts the cyclic scheduler on the given
    /// spawner.
    pub async fn start_with<S: TaskSpawner>(&self, spawner: &S) -> EngineResult<()> {
        self.topology.refresh_topology().await;
        self.scheduler.start(spawner)?;
        log::info!(
            "[Engine] Started with {} zone(s)",
            self.state.zone_count()
        );
        Ok(())
    }

    /// Stops the scheduler's three loops. In-flight transport commands are
    /// not cancelled; they complete on their own.
    pub fn shutdown(&self) {
        log::info!("[Engine] Shutting down");
        self.scheduler.cancel_token().cancel();
    }
}
