use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::fairness::{FairnessAccumulator, FairnessMetrics};
use crate::intersection_params::IntersectionParams;
use crate::phase::PhaseState;
use crate::queue_model::QueueModel;
use crate::scenario::TrafficScenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    Running,
    /// Horizon reached.
    Done,
    /// An invariant broke; the episode will not step again until reset.
    Faulted,
}

/// Immutable snapshot of one episode, produced once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub tick: u64,
    pub horizon: u64,
    pub status: EpisodeStatus,
    pub phase: PhaseState,
    pub queues: QueueModel,
    pub fairness: FairnessAccumulator,
    pub metrics: FairnessMetrics,
    pub cumulative_reward: f64,
    pub total_served: u64,
    pub ticks_green_ew: u64,
    pub ticks_green_ns: u64,
    pub green_pct_ew: f64,
    pub green_pct_ns: f64,
    pub safety_violations: u64,
    pub decision_failures: u64,
    pub scenario: TrafficScenario,
    /// Non-fatal degradation on the most recent tick, or the fault reason
    /// once `status` is `Faulted`.
    pub error: Option<String>,
}

impl EpisodeState {
    pub fn initial(params: &IntersectionParams, scenario: TrafficScenario) -> Self {
        Self {
            tick: 0,
            horizon: params.horizon,
            status: EpisodeStatus::Running,
            phase: PhaseState::new(params.initial_phase),
            queues: QueueModel::new(params.service.max_queue),
            fairness: FairnessAccumulator::default(),
            metrics: FairnessMetrics::default(),
            cumulative_reward: 0.0,
            total_served: 0,
            ticks_green_ew: 0,
            ticks_green_ns: 0,
            green_pct_ew: 0.0,
            green_pct_ns: 0.0,
            safety_violations: 0,
            decision_failures: 0,
            scenario,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == EpisodeStatus::Done
    }

    pub fn is_faulted(&self) -> bool {
        self.status == EpisodeStatus::Faulted
    }

    pub fn green_pct(&self, axis: Axis) -> f64 {
        match axis {
            Axis::EastWest => self.green_pct_ew,
            Axis::NorthSouth => self.green_pct_ns,
        }
    }

    pub fn wait(&self, axis: Axis) -> f64 {
        self.metrics.wait(axis)
    }

    pub fn fairness_gap(&self) -> f64 {
        self.metrics.gap
    }
}
