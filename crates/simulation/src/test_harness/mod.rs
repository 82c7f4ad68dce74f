//! # TestIntersection: headless integration test harness
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + `IntersectionPlugin` so
//! tests can register episodes, drive the `FixedUpdate` schedule tick by
//! tick, and inspect the registry and published snapshots.

mod assertions;
mod queries;
mod setup;

use bevy::app::App;

use crate::registry::EpisodeRegistry;

/// A headless Bevy App driving the intersection episodes for tests.
pub struct TestIntersection {
    app: App,
}

impl TestIntersection {
    /// Empty registry, clock running.
    pub fn new() -> Self {
        let mut app = crate::headless_app();
        // Run one update so Startup schedules execute before the first tick.
        app.update();
        Self { app }
    }

    /// Registry whose derived seeds start at `seed_base`.
    pub fn with_seed_base(seed_base: u64) -> Self {
        let mut harness = Self::new();
        harness
            .app
            .world_mut()
            .insert_resource(EpisodeRegistry::with_seed_base(seed_base));
        harness
    }

    /// Access the underlying Bevy App.
    pub fn app(&mut self) -> &mut App {
        &mut self.app
    }
}

impl Default for TestIntersection {
    fn default() -> Self {
        Self::new()
    }
}
