//! Query and tick methods for `TestIntersection`.

use bevy::prelude::*;

use crate::episode::EpisodeState;
use crate::plugin::{ClockControl, EpisodeTicked, LatestSnapshots};
use crate::registry::{EpisodeId, EpisodeRegistry};
use crate::remote_decision::PendingDecisions;

use super::TestIntersection;

impl TestIntersection {
    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks by directly executing the `FixedUpdate`
    /// schedule, bypassing Bevy's virtual time.
    ///
    /// A `yield_now()` is inserted between ticks so that background threads
    /// (the `AsyncComputeTaskPool` running offloaded decisions) get a chance
    /// to make progress even when the test drives the schedule in a tight
    /// loop on a low-core CI runner.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
            std::thread::yield_now();
        }
    }

    /// Tick until no episode is running, or `max_ticks` schedule runs.
    /// Returns the number of schedule runs taken.
    pub fn tick_until_settled(&mut self, max_ticks: u32) -> u32 {
        for n in 0..max_ticks {
            if !self.registry().iter().any(|(_, ep)| ep.is_running()) {
                return n;
            }
            self.tick(1);
        }
        max_ticks
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn registry(&self) -> &EpisodeRegistry {
        self.app.world().resource::<EpisodeRegistry>()
    }

    pub fn state(&self, id: EpisodeId) -> &EpisodeState {
        self.registry()
            .get(id)
            .map(|episode| episode.state())
            .expect("episode should exist")
    }

    pub fn tick_of(&self, id: EpisodeId) -> u64 {
        self.state(id).tick
    }

    pub fn latest_snapshot(&self, id: EpisodeId) -> Option<&EpisodeState> {
        self.app.world().resource::<LatestSnapshots>().get(id)
    }

    pub fn pending_decisions(&self) -> usize {
        self.app.world().resource::<PendingDecisions>().len()
    }

    pub fn clock_mut(&mut self) -> Mut<'_, ClockControl> {
        self.app.world_mut().resource_mut::<ClockControl>()
    }

    /// Drain every `EpisodeTicked` event still buffered.
    pub fn drain_ticked(&mut self) -> Vec<EpisodeTicked> {
        self.app
            .world_mut()
            .resource_mut::<Events<EpisodeTicked>>()
            .drain()
            .collect()
    }
}
