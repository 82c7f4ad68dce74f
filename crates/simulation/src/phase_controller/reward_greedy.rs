//! One-step lookahead over the episode's own reward model.
//!
//! Each candidate axis is scored by serving it on a copy of the queues,
//! folding the result into a copy of the fairness accumulator, and pricing
//! the outcome with the configured weights. Only the unsafe-switch flag is
//! known at decision time, so fast-car risk is not part of the score.
//! The current phase is scored first and wins ties.

use crate::axis::Axis;
use crate::reward::{compute_reward, RewardInputs};
use crate::safety::is_unsafe_switch;

use super::{DecisionContext, DecisionError, PhaseController};

#[derive(Debug, Clone, Copy, Default)]
pub struct RewardGreedyController;

/// Reward the episode would collect this tick if `candidate` were green.
pub fn score_candidate(ctx: &DecisionContext<'_>, candidate: Axis) -> f64 {
    let params = ctx.params;
    let mut queues = *ctx.queues;
    let outcome = queues.serve(candidate, params.service.flow(ctx.scenario));
    let gap = ctx.fairness.update(&queues).metrics(ctx.tick + 1).gap;
    let switched = candidate != ctx.phase.green;
    let unsafe_switch = is_unsafe_switch(
        switched,
        ctx.phase.ticks_since_phase_start,
        params.safety.min_green_ticks,
    );
    compute_reward(
        &params.reward,
        &RewardInputs {
            served: outcome.served,
            total_queue: queues.total(),
            switched,
            fairness_gap: gap,
            safety_violations: unsafe_switch as u32,
        },
    )
    .total
}

impl PhaseController for RewardGreedyController {
    fn label(&self) -> &'static str {
        "reward_greedy"
    }

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError> {
        let hold = ctx.phase.green;
        let switch = hold.other();
        if score_candidate(ctx, switch) > score_candidate(ctx, hold) {
            Ok(switch)
        } else {
            Ok(hold)
        }
    }
}
