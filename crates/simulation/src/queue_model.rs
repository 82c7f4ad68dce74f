//! Per-approach vehicle queues with Bernoulli arrivals and capped service.
//!
//! Four approach queues (N, S, E, W) are grouped into the two signal axes.
//! Arrivals add at most one vehicle per approach per tick, clipped to
//! `max_queue`; service removes up to `flow` vehicles from each approach of
//! the green axis and never drives a queue below zero.

use serde::{Deserialize, Serialize};

use crate::axis::{Approach, Axis};
use crate::sim_rng::SimRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueModel {
    /// Indexed by `Approach::index()`.
    lengths: [u32; 4],
    max_queue: u32,
}

/// Result of serving one axis for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOutcome {
    pub served: u32,
    pub remaining: u32,
}

impl QueueModel {
    pub fn new(max_queue: u32) -> Self {
        Self {
            lengths: [0; 4],
            max_queue,
        }
    }

    pub fn max_queue(&self) -> u32 {
        self.max_queue
    }

    pub fn approach(&self, approach: Approach) -> u32 {
        self.lengths[approach.index()]
    }

    pub fn axis_total(&self, axis: Axis) -> u32 {
        axis.approaches()
            .iter()
            .map(|a| self.lengths[a.index()])
            .sum()
    }

    pub fn total(&self) -> u32 {
        self.lengths.iter().sum()
    }

    /// One Bernoulli(`rate`) draw per approach of `axis`. Returns the new
    /// axis total.
    pub fn arrive(&mut self, axis: Axis, rate: f64, rng: &mut SimRng) -> u32 {
        for approach in axis.approaches() {
            if rng.chance(rate) {
                let slot = &mut self.lengths[approach.index()];
                *slot = (*slot + 1).min(self.max_queue);
            }
        }
        self.axis_total(axis)
    }

    /// Serve up to `flow` vehicles from each approach of `axis`.
    pub fn serve(&mut self, axis: Axis, flow: u32) -> ServiceOutcome {
        let mut served = 0;
        for approach in axis.approaches() {
            let slot = &mut self.lengths[approach.index()];
            let take = (*slot).min(flow);
            *slot -= take;
            served += take;
        }
        ServiceOutcome {
            served,
            remaining: self.axis_total(axis),
        }
    }

    /// Queue lengths normalised by the cap, in N, S, E, W order.
    pub fn normalized(&self) -> [f32; 4] {
        let cap = self.max_queue.max(1) as f32;
        self.lengths.map(|len| len as f32 / cap)
    }

    pub fn lengths(&self) -> [u32; 4] {
        self.lengths
    }

    #[cfg(test)]
    pub(crate) fn set_approach(&mut self, approach: Approach, len: u32) {
        self.lengths[approach.index()] = len;
    }
}
