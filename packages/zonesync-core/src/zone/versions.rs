//! Change-version tracking: the dirty-bit protocol bridging push
//! notifications and pull refreshes.
//!
//! Each zone keeps one committed/observed stamp pair per refreshable
//! resource. A notification bumps `observed`; the secondary scheduler tick
//! refreshes every resource whose pair differs and commits on success.
//! Stamps are opaque tokens from the transport layer; equality is the only
//! comparison ever performed on them.

use serde::Serialize;

/// Resources covered by version tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Queue,
    Favorites,
    MusicDb,
}

impl ResourceKind {
    /// All tracked resources, in refresh order.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Queue,
        ResourceKind::Favorites,
        ResourceKind::MusicDb,
    ];

    /// Short label for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Favorites => "favorites",
            Self::MusicDb => "music-db",
        }
    }
}

/// A committed/observed stamp pair for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCounter {
    committed: String,
    observed: String,
}

impl VersionCounter {
    /// Records a newly observed stamp. Returns `true` when the observed
    /// value actually changed.
    pub fn observe(&mut self, stamp: &str) -> bool {
        if self.observed == stamp {
            return false;
        }
        self.observed = stamp.to_string();
        true
    }

    /// A refresh is due iff the committed stamp lags the observed one.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.committed != self.observed
    }

    /// Marks the observed stamp as refreshed. Idempotent: committing twice
    /// after the same observation is a no-op the second time.
    pub fn commit(&mut self) {
        self.committed = self.observed.clone();
    }

    /// The last observed stamp.
    #[must_use]
    pub fn observed(&self) -> &str {
        &self.observed
    }
}

/// The per-zone set of version counters, one per [`ResourceKind`].
#[derive(Debug, Clone, Default)]
pub struct VersionCounters {
    queue: VersionCounter,
    favorites: VersionCounter,
    music_db: VersionCounter,
}

impl VersionCounters {
    fn counter_mut(&mut self, kind: ResourceKind) -> &mut VersionCounter {
        match kind {
            ResourceKind::Queue => &mut self.queue,
            ResourceKind::Favorites => &mut self.favorites,
            ResourceKind::MusicDb => &mut self.music_db,
        }
    }

    fn counter(&self, kind: ResourceKind) -> &VersionCounter {
        match kind {
            ResourceKind::Queue => &self.queue,
            ResourceKind::Favorites => &self.favorites,
            ResourceKind::MusicDb => &self.music_db,
        }
    }

    /// Records a notification stamp for one resource. Returns `true` when
    /// the observation changed the counter.
    pub fn observe(&mut self, kind: ResourceKind, stamp: &str) -> bool {
        self.counter_mut(kind).observe(stamp)
    }

    /// Whether the resource needs a pull refresh.
    #[must_use]
    pub fn is_dirty(&self, kind: ResourceKind) -> bool {
        self.counter(kind).is_dirty()
    }

    /// Marks the resource as refreshed.
    pub fn commit(&mut self, kind: ResourceKind) {
        self.counter_mut(kind).commit();
    }
}
