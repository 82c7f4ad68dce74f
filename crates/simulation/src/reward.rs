//! Scalar step reward.
//!
//! ```text
//! reward = throughput * served
//!        - queue_penalty * total_queue
//!        - switch_penalty * switched
//!        - fairness * fairness_gap
//!        - safety * safety_violations
//! ```
//!
//! `fairness = 0` is the reward-hacking baseline; any positive fairness
//! weight is the mitigated configuration. Rewards are summed over the
//! episode without discounting.

use serde::{Deserialize, Serialize};

use crate::intersection_params::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub throughput: f64,
    pub queue_penalty: f64,
    pub switch_penalty: f64,
    pub fairness: f64,
    pub safety: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            throughput: 1.0,
            queue_penalty: 0.01,
            switch_penalty: 0.05,
            fairness: 0.0,
            safety: 2.0,
        }
    }
}

impl RewardWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("reward.throughput", self.throughput),
            ("reward.queue_penalty", self.queue_penalty),
            ("reward.switch_penalty", self.switch_penalty),
            ("reward.fairness", self.fairness),
            ("reward.safety", self.safety),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { field, value });
            }
        }
        Ok(())
    }
}

/// Everything the reward depends on for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardInputs {
    pub served: u32,
    /// Sum of all four approach queues after service.
    pub total_queue: u32,
    pub switched: bool,
    pub fairness_gap: f64,
    pub safety_violations: u32,
}

/// Per-term breakdown. Penalties are stored as positive magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardComponents {
    pub throughput: f64,
    pub queue_penalty: f64,
    pub switch_penalty: f64,
    pub fairness_penalty: f64,
    pub safety_penalty: f64,
    pub total: f64,
}

/// Pure function of its inputs: recomputing from recorded inputs reproduces
/// the recorded value bit-for-bit.
pub fn compute_reward(weights: &RewardWeights, inputs: &RewardInputs) -> RewardComponents {
    let throughput = weights.throughput * inputs.served as f64;
    let queue_penalty = weights.queue_penalty * inputs.total_queue as f64;
    let switch_penalty = weights.switch_penalty * if inputs.switched { 1.0 } else { 0.0 };
    let fairness_penalty = weights.fairness * inputs.fairness_gap;
    let safety_penalty = weights.safety * inputs.safety_violations as f64;
    RewardComponents {
        throughput,
        queue_penalty,
        switch_penalty,
        fairness_penalty,
        safety_penalty,
        total: throughput - queue_penalty - switch_penalty - fairness_penalty - safety_penalty,
    }
}
