//! Signal phase state machine: which axis is green and for how long.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub green: Axis,
    /// Reset to 0 on every transition, incremented on every hold.
    pub ticks_since_phase_start: u32,
}

/// Result of applying one controller decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub state: PhaseState,
    pub switched: bool,
    /// `ticks_since_phase_start` before the decision was applied.
    pub ticks_before: u32,
}

impl PhaseState {
    pub fn new(green: Axis) -> Self {
        Self {
            green,
            ticks_since_phase_start: 0,
        }
    }

    pub fn transition(self, next: Axis) -> PhaseTransition {
        let switched = next != self.green;
        let state = if switched {
            PhaseState::new(next)
        } else {
            PhaseState {
                green: self.green,
                ticks_since_phase_start: self.ticks_since_phase_start.saturating_add(1),
            }
        };
        PhaseTransition {
            state,
            switched,
            ticks_before: self.ticks_since_phase_start,
        }
    }

    /// `min(ticks / min_green, 1)`, as exposed to decision ports.
    pub fn normalized_age(&self, min_green_ticks: u32) -> f32 {
        let min_green = min_green_ticks.max(1) as f32;
        (self.ticks_since_phase_start as f32 / min_green).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_increments() {
        let t = PhaseState::new(Axis::EastWest).transition(Axis::EastWest);
        assert!(!t.switched);
        assert_eq!(t.state.ticks_since_phase_start, 1);
        assert_eq!(t.ticks_before, 0);
    }

    #[test]
    fn test_switch_resets() {
        let state = PhaseState {
            green: Axis::EastWest,
            ticks_since_phase_start: 9,
        };
        let t = state.transition(Axis::NorthSouth);
        assert!(t.switched);
        assert_eq!(t.state, PhaseState::new(Axis::NorthSouth));
        assert_eq!(t.ticks_before, 9);
    }

    #[test]
    fn test_normalized_age_saturates() {
        let state = PhaseState {
            green: Axis::NorthSouth,
            ticks_since_phase_start: 3,
        };
        assert_eq!(state.normalized_age(6), 0.5);
        let old = PhaseState {
            green: Axis::NorthSouth,
            ticks_since_phase_start: 40,
        };
        assert_eq!(old.normalized_age(6), 1.0);
    }
}
