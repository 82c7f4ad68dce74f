//! Safety flags: switching before the minimum green time, and fast cars
//! approaching a red light in poor visibility.
//!
//! Violations are penalised by the reward model and counted in the episode
//! totals. They never end an episode.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::config::{DEFAULT_MIN_GREEN_TICKS, TTC_VISIBILITY_SCALE};
use crate::intersection_params::ConfigError;
use crate::scenario::TrafficScenario;
use crate::sim_rng::SimRng;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyParams {
    /// Switching while the current phase is younger than this is unsafe.
    pub min_green_ticks: u32,
    /// A fast car with time-to-collision below this is a risk event.
    pub ttc_threshold: f64,
}

impl Default for SafetyParams {
    fn default() -> Self {
        Self {
            min_green_ticks: DEFAULT_MIN_GREEN_TICKS,
            ttc_threshold: 1.2,
        }
    }
}

impl SafetyParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_green_ticks == 0 {
            return Err(ConfigError::NotPositive {
                field: "safety.min_green_ticks",
            });
        }
        if !self.ttc_threshold.is_finite() || self.ttc_threshold < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "safety.ttc_threshold",
                value: self.ttc_threshold,
            });
        }
        Ok(())
    }
}

/// Whether a fast car showed up on each axis this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FastCarDraw {
    pub east_west: bool,
    pub north_south: bool,
}

impl FastCarDraw {
    /// One draw per axis, EW first. Always consumes two draws when `p < 1`.
    pub fn sample(rng: &mut SimRng, p: f64) -> Self {
        let east_west = rng.chance(p);
        let north_south = rng.chance(p);
        Self {
            east_west,
            north_south,
        }
    }

    pub fn on(&self, axis: Axis) -> bool {
        match axis {
            Axis::EastWest => self.east_west,
            Axis::NorthSouth => self.north_south,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyFlags {
    pub unsafe_switch: bool,
    /// Fast NS car while NS is red.
    pub risk_ns: bool,
    /// Fast EW car while EW is red.
    pub risk_ew: bool,
}

impl SafetyFlags {
    pub fn violation_count(&self) -> u32 {
        self.unsafe_switch as u32 + self.risk_ns as u32 + self.risk_ew as u32
    }

    pub fn any(&self) -> bool {
        self.violation_count() > 0
    }
}

pub fn is_unsafe_switch(switched: bool, ticks_before_switch: u32, min_green_ticks: u32) -> bool {
    switched && ticks_before_switch < min_green_ticks
}

pub fn time_to_collision(visibility: f64) -> f64 {
    visibility * TTC_VISIBILITY_SCALE
}

/// Evaluate the flags for a tick once the green axis for that tick is known.
pub fn assess(
    params: &SafetyParams,
    scenario: &TrafficScenario,
    fast_cars: FastCarDraw,
    unsafe_switch: bool,
    green: Axis,
) -> SafetyFlags {
    let close = time_to_collision(scenario.visibility) < params.ttc_threshold;
    SafetyFlags {
        unsafe_switch,
        risk_ns: fast_cars.north_south && close && green == Axis::EastWest,
        risk_ew: fast_cars.east_west && close && green == Axis::NorthSouth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foggy() -> TrafficScenario {
        TrafficScenario {
            visibility: 0.3,
            ..TrafficScenario::default()
        }
    }

    #[test]
    fn test_unsafe_switch_before_min_green() {
        assert!(is_unsafe_switch(true, 2, 6));
        assert!(!is_unsafe_switch(true, 6, 6));
        assert!(!is_unsafe_switch(false, 0, 6));
    }

    #[test]
    fn test_fast_car_on_red_axis_is_risk() {
        let params = SafetyParams::default();
        let draw = FastCarDraw {
            east_west: false,
            north_south: true,
        };
        let flags = assess(&params, &foggy(), draw, false, Axis::EastWest);
        assert!(flags.risk_ns);
        assert!(!flags.risk_ew);
        assert_eq!(flags.violation_count(), 1);
    }

    #[test]
    fn test_fast_car_on_green_axis_is_safe() {
        let params = SafetyParams::default();
        let draw = FastCarDraw {
            east_west: false,
            north_south: true,
        };
        let flags = assess(&params, &foggy(), draw, false, Axis::NorthSouth);
        assert!(!flags.any());
    }

    #[test]
    fn test_clear_visibility_never_risky() {
        let params = SafetyParams::default();
        let draw = FastCarDraw {
            east_west: true,
            north_south: true,
        };
        let flags = assess(&params, &TrafficScenario::default(), draw, false, Axis::EastWest);
        assert!(!flags.any());
    }

    #[test]
    fn test_violation_count_sums_flags() {
        let flags = SafetyFlags {
            unsafe_switch: true,
            risk_ns: true,
            risk_ew: true,
        };
        assert_eq!(flags.violation_count(), 3);
    }

    #[test]
    fn test_fast_car_draw_consumes_two_words_even_at_zero() {
        let mut a = SimRng::from_seed_u64(9);
        let mut b = SimRng::from_seed_u64(9);
        FastCarDraw::sample(&mut a, 0.0);
        b.chance(0.5);
        b.chance(0.5);
        assert_eq!(a.word_pos(), b.word_pos());
    }
}
