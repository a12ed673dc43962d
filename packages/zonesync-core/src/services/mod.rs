//! Engine services layer.
//!
//! The services orchestrate between the observer registry, the shared fleet
//! state and the device transport:
//!
//! - `topology` - Group snapshot recomputation and diffing
//! - `playback` - Transport event parsing and group-wide propagation
//! - `subscriptions` - Subscription lifecycle + notification routing
//! - `library` - Queue / favorites / music-database pull refreshes
//! - `volume` - Volume and balance sampling and commands
//! - `sleep_timer` - Coordinator sleep-timer polling
//! - `line_in` - Aux source discovery and playback
//! - `commands` - The exposed command surface
//! - `scheduler` - The three-rate cyclic driver

pub mod commands;
pub mod library;
pub mod line_in;
pub mod playback;
pub mod scheduler;
pub mod sleep_timer;
pub mod subscriptions;
pub mod topology;
pub mod volume;

pub use commands::{
    CommandSurface, GroupAction, PlayAction, PlayMode, QueueSelection, RadioSelector,
    SleepTimerAction, TrackDirection,
};
pub use library::LibraryService;
pub use line_in::LineInService;
pub use playback::PlaybackSynchronizer;
pub use scheduler::CyclicScheduler;
pub use sleep_timer::SleepTimerService;
pub use subscriptions::{NotificationProcessor, SubscriptionLifecycle};
pub use topology::TopologyManager;
pub use volume::{BalanceAction, VolumeAction, VolumeService};
