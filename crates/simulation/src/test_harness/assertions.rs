//! Assertion helpers for `TestIntersection` integration tests.

use crate::axis::Axis;
use crate::registry::EpisodeId;

use super::TestIntersection;

impl TestIntersection {
    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_tick(&self, id: EpisodeId, expected: u64) {
        let tick = self.tick_of(id);
        assert_eq!(tick, expected, "{id}: expected tick {expected}, got {tick}");
    }

    pub fn assert_done(&self, id: EpisodeId) {
        let state = self.state(id);
        assert!(
            state.is_done(),
            "{id}: expected Done, got {:?} at tick {}",
            state.status,
            state.tick
        );
    }

    pub fn assert_faulted(&self, id: EpisodeId) {
        let state = self.state(id);
        assert!(state.is_faulted(), "{id}: expected Faulted, got {:?}", state.status);
    }

    /// Assert the absolute cumulative-wait gap is within `[min, max]`.
    pub fn assert_gap_between(&self, id: EpisodeId, min: f64, max: f64) {
        let gap = self.state(id).fairness_gap();
        assert!(
            gap >= min && gap <= max,
            "{id}: expected fairness gap in [{min}, {max}], got {gap}"
        );
    }

    pub fn assert_green_share_between(&self, id: EpisodeId, axis: Axis, min: f64, max: f64) {
        let share = self.state(id).green_pct(axis);
        assert!(
            share >= min && share <= max,
            "{id}: expected {} green share in [{min}, {max}], got {share}",
            axis.label()
        );
    }
}
