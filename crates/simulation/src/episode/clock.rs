//! The per-tick fold: `(EpisodeState, SimRng, decision) -> EpisodeState`.
//!
//! Order within a tick is fixed:
//!
//! 1. arrivals (East, West, then North, South)
//! 2. fast-car draws (EW, then NS)
//! 3. controller decision on the post-arrival queues
//! 4. service of the axis now green
//! 5. fairness update, safety assessment, reward
//! 6. invariant check and the new snapshot
//!
//! Steps 1-2 are [`draw_arrivals`]; steps 3-6 are [`resolve_tick`]. The
//! driver stages arrivals before it hands an offloaded port its
//! observation, so every controller decides on the same post-arrival view.
//! Nothing here logs or touches the controller directly, so the same fold
//! serves inline controllers, offloaded decisions and replays.

use crate::axis::Axis;
use crate::intersection_params::IntersectionParams;
use crate::observation::{Observation, StepInfo};
use crate::phase_controller::{DecisionContext, DecisionError};
use crate::queue_model::QueueModel;
use crate::reward::{compute_reward, RewardInputs};
use crate::safety::{self, is_unsafe_switch, FastCarDraw};
use crate::sim_rng::SimRng;
use crate::simulation_invariants::check_tick;

use super::error::InvariantViolation;
use super::state::{EpisodeState, EpisodeStatus};

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: EpisodeState,
    /// The axis that was green this tick.
    pub action: Axis,
    pub reward: f64,
    pub info: StepInfo,
    /// Present when the decision failed and the phase was held.
    pub degraded: Option<DecisionError>,
}

/// Observation a controller would see for the next tick if it were asked
/// before arrivals are drawn.
pub fn pre_tick_observation(state: &EpisodeState, params: &IntersectionParams) -> Observation {
    Observation::build(
        &state.queues,
        &state.phase,
        params.safety.min_green_ticks,
        &state.scenario,
    )
}

/// Arrivals and fast-car draws for the tick after `tick`, waiting for a
/// decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedTick {
    /// Tick of the state the draws were made from.
    pub tick: u64,
    pub queues: QueueModel,
    pub fast_cars: FastCarDraw,
    /// What the controller sees: post-arrival queues, pre-decision phase.
    pub observation: Observation,
}

/// Steps 1-2: draw this tick's arrivals and fast cars from `rng`.
pub fn draw_arrivals(
    prev: &EpisodeState,
    params: &IntersectionParams,
    rng: &mut SimRng,
) -> StagedTick {
    let scenario = prev.scenario;
    let mut queues = prev.queues;
    for axis in Axis::ALL {
        queues.arrive(axis, scenario.arrival_rate(axis), rng);
    }
    let fast_cars = FastCarDraw::sample(rng, scenario.fast_car_prob);
    StagedTick {
        tick: prev.tick,
        queues,
        fast_cars,
        observation: Observation::build(
            &queues,
            &prev.phase,
            params.safety.min_green_ticks,
            &scenario,
        ),
    }
}

/// Steps 3-6 on previously staged draws. Consumes no randomness.
pub fn resolve_tick<F>(
    prev: &EpisodeState,
    params: &IntersectionParams,
    staged: StagedTick,
    decide: F,
) -> Result<TickOutcome, InvariantViolation>
where
    F: FnOnce(&DecisionContext<'_>) -> Result<Axis, DecisionError>,
{
    debug_assert_eq!(staged.tick, prev.tick);
    let scenario = prev.scenario;
    let mut queues = staged.queues;
    let fast_cars = staged.fast_cars;

    let ctx = DecisionContext {
        tick: prev.tick,
        phase: prev.phase,
        queues: &queues,
        fairness: &prev.fairness,
        scenario: &scenario,
        params,
        observation: staged.observation,
    };
    let (next, degraded) = match decide(&ctx) {
        Ok(axis) => (axis, None),
        Err(err) => (prev.phase.green, Some(err)),
    };

    let transition = prev.phase.transition(next);
    let green = transition.state.green;
    let unsafe_switch = is_unsafe_switch(
        transition.switched,
        transition.ticks_before,
        params.safety.min_green_ticks,
    );

    let queued = queues.axis_total(green);
    let service = queues.serve(green, params.service.flow(&scenario));

    let tick = prev.tick + 1;
    let fairness = prev.fairness.update(&queues);
    let metrics = fairness.metrics(tick);
    let flags = safety::assess(&params.safety, &scenario, fast_cars, unsafe_switch, green);

    let reward = compute_reward(
        &params.reward,
        &RewardInputs {
            served: service.served,
            total_queue: queues.total(),
            switched: transition.switched,
            fairness_gap: metrics.gap,
            safety_violations: flags.violation_count(),
        },
    );

    let (ticks_green_ew, ticks_green_ns) = match green {
        Axis::EastWest => (prev.ticks_green_ew + 1, prev.ticks_green_ns),
        Axis::NorthSouth => (prev.ticks_green_ew, prev.ticks_green_ns + 1),
    };
    let error = degraded.as_ref().map(|e| e.to_string());

    let state = EpisodeState {
        tick,
        horizon: prev.horizon,
        status: if tick >= prev.horizon {
            EpisodeStatus::Done
        } else {
            EpisodeStatus::Running
        },
        phase: transition.state,
        queues,
        fairness,
        metrics,
        cumulative_reward: prev.cumulative_reward + reward.total,
        total_served: prev.total_served + service.served as u64,
        ticks_green_ew,
        ticks_green_ns,
        green_pct_ew: ticks_green_ew as f64 / tick as f64,
        green_pct_ns: ticks_green_ns as f64 / tick as f64,
        safety_violations: prev.safety_violations + flags.violation_count() as u64,
        decision_failures: prev.decision_failures + degraded.is_some() as u64,
        scenario,
        error: error.clone(),
    };

    check_tick(prev, &state, queued, service)?;

    let info = StepInfo::new(
        tick,
        green,
        transition.switched,
        &state.queues,
        service.served,
        &metrics,
        flags,
        scenario,
        reward,
        error,
    );

    Ok(TickOutcome {
        state,
        action: green,
        reward: reward.total,
        info,
        degraded,
    })
}
