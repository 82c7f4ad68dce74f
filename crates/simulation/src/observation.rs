//! Observation vector handed to decision ports and the per-step info record.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::config::OBSERVATION_WIDTH;
use crate::episode::EpisodeState;
use crate::fairness::FairnessMetrics;
use crate::phase::PhaseState;
use crate::queue_model::QueueModel;
use crate::reward::RewardComponents;
use crate::safety::SafetyFlags;
use crate::scenario::TrafficScenario;

/// Fixed-width feature vector:
///
/// | index | feature                                  |
/// |-------|------------------------------------------|
/// | 0..4  | N, S, E, W queue / cap                   |
/// | 4     | phase (0 = EW green, 1 = NS green)       |
/// | 5     | min(ticks since switch / min green, 1)   |
/// | 6     | visibility                               |
/// | 7     | fast car probability                     |
/// | 8     | 1 if EW demand exceeds NS demand         |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f32; OBSERVATION_WIDTH]);

impl Observation {
    pub fn build(
        queues: &QueueModel,
        phase: &PhaseState,
        min_green_ticks: u32,
        scenario: &TrafficScenario,
    ) -> Self {
        let q = queues.normalized();
        Observation([
            q[0],
            q[1],
            q[2],
            q[3],
            phase.green.action() as f32,
            phase.normalized_age(min_green_ticks),
            scenario.visibility as f32,
            scenario.fast_car_prob as f32,
            if scenario.ew_dominant() { 1.0 } else { 0.0 },
        ])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn phase(&self) -> Axis {
        if self.0[4] >= 0.5 {
            Axis::NorthSouth
        } else {
            Axis::EastWest
        }
    }
}

/// Diagnostics for one completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Tick count after this step.
    pub tick: u64,
    pub phase: Axis,
    pub switched: bool,
    pub queue_ns: u32,
    pub queue_ew: u32,
    /// Vehicles served this tick.
    pub throughput: u32,
    pub avg_wait_ns: f64,
    pub avg_wait_ew: f64,
    pub fairness_gap: f64,
    pub fairness_ratio: f64,
    pub unsafe_switch: bool,
    pub risk_ns: bool,
    pub risk_ew: bool,
    pub scenario: TrafficScenario,
    pub reward: RewardComponents,
    /// Set when the decision for this tick degraded to a phase hold.
    pub error: Option<String>,
}

impl StepInfo {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tick: u64,
        phase: Axis,
        switched: bool,
        queues: &QueueModel,
        throughput: u32,
        metrics: &FairnessMetrics,
        flags: SafetyFlags,
        scenario: TrafficScenario,
        reward: RewardComponents,
        error: Option<String>,
    ) -> Self {
        Self {
            tick,
            phase,
            switched,
            queue_ns: queues.axis_total(Axis::NorthSouth),
            queue_ew: queues.axis_total(Axis::EastWest),
            throughput,
            avg_wait_ns: metrics.wait_ns,
            avg_wait_ew: metrics.wait_ew,
            fairness_gap: metrics.gap,
            fairness_ratio: metrics.ratio,
            unsafe_switch: flags.unsafe_switch,
            risk_ns: flags.risk_ns,
            risk_ew: flags.risk_ew,
            scenario,
            reward,
            error,
        }
    }

    /// Record describing an episode that has not stepped yet.
    pub fn initial(state: &EpisodeState) -> Self {
        Self::new(
            state.tick,
            state.phase.green,
            false,
            &state.queues,
            0,
            &state.metrics,
            SafetyFlags::default(),
            state.scenario,
            RewardComponents::default(),
            state.error.clone(),
        )
    }

    pub fn safety_violations(&self) -> u32 {
        self.unsafe_switch as u32 + self.risk_ns as u32 + self.risk_ew as u32
    }
}
