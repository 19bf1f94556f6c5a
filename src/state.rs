use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::{LightColors, Timeline};

// ── Shared timeline ──────────────────────────────────────────────

/// The timeline currently being played, shared between the render loop and
/// whoever builds the next one.
///
/// Timelines are never mutated in place: a new one is built off to the side
/// and swapped in whole. Readers clone the `Arc` and sample without holding
/// the lock.
#[derive(Debug, Default)]
pub struct SharedTimeline {
    current: RwLock<Option<Arc<Timeline>>>,
}

impl SharedTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `timeline`, returning the one it replaces.
    pub fn swap(&self, timeline: Timeline) -> Option<Arc<Timeline>> {
        self.current.write().replace(Arc::new(timeline))
    }

    /// Drop the current timeline, e.g. when playback stops.
    pub fn clear(&self) -> Option<Arc<Timeline>> {
        self.current.write().take()
    }

    pub fn current(&self) -> Option<Arc<Timeline>> {
        self.current.read().clone()
    }

    /// Read-only access to the current timeline. Holds the read lock for the
    /// duration of `f`.
    pub fn with_timeline<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Timeline) -> R,
    {
        let guard = self.current.read();
        guard.as_deref().map(f)
    }

    /// Colors at playback progress `t`, or None when nothing is loaded.
    pub fn sample(&self, t: f64) -> Option<LightColors> {
        self.current().map(|timeline| timeline.sample(t))
    }
}
