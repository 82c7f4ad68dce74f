use std::sync::Arc;

use super::*;
use crate::axis::Approach;
use crate::intersection_params::TickWindow;
use crate::reward::RewardWeights;

struct Fixture {
    params: IntersectionParams,
    queues: QueueModel,
    fairness: FairnessAccumulator,
    scenario: TrafficScenario,
}

impl Fixture {
    fn new() -> Self {
        Self {
            params: IntersectionParams::default(),
            queues: QueueModel::new(20),
            fairness: FairnessAccumulator::default(),
            scenario: TrafficScenario::default(),
        }
    }

    fn ctx(&self, tick: u64, phase: PhaseState) -> DecisionContext<'_> {
        DecisionContext {
            tick,
            phase,
            queues: &self.queues,
            fairness: &self.fairness,
            scenario: &self.scenario,
            params: &self.params,
            observation: Observation::build(
                &self.queues,
                &phase,
                self.params.safety.min_green_ticks,
                &self.scenario,
            ),
        }
    }
}

fn settled(green: Axis) -> PhaseState {
    PhaseState {
        green,
        ticks_since_phase_start: 20,
    }
}

// ---------------------------------------------------------------------------
// Fixed cycle
// ---------------------------------------------------------------------------

#[test]
fn test_fixed_cycle_alternates_every_period() {
    let fx = Fixture::new();
    let mut c = FixedCycleController::new(50, Axis::EastWest);
    let phase = settled(Axis::EastWest);
    assert_eq!(c.decide(&fx.ctx(0, phase)).unwrap(), Axis::EastWest);
    assert_eq!(c.decide(&fx.ctx(49, phase)).unwrap(), Axis::EastWest);
    assert_eq!(c.decide(&fx.ctx(50, phase)).unwrap(), Axis::NorthSouth);
    assert_eq!(c.decide(&fx.ctx(99, phase)).unwrap(), Axis::NorthSouth);
    assert_eq!(c.decide(&fx.ctx(100, phase)).unwrap(), Axis::EastWest);
}

#[test]
fn test_fixed_cycle_ignores_queues() {
    let mut fx = Fixture::new();
    fx.queues.set_approach(Approach::North, 20);
    fx.queues.set_approach(Approach::South, 20);
    let mut c = FixedCycleController::new(60, Axis::EastWest);
    assert_eq!(
        c.decide(&fx.ctx(10, settled(Axis::EastWest))).unwrap(),
        Axis::EastWest
    );
}

// ---------------------------------------------------------------------------
// Static imbalanced
// ---------------------------------------------------------------------------

#[test]
fn test_static_imbalanced_windows() {
    let fx = Fixture::new();
    let mut c = StaticImbalancedController::new(vec![
        TickWindow::new(70, 80),
        TickWindow::new(150, 160),
    ]);
    let phase = settled(Axis::EastWest);
    let ns_ticks: Vec<u64> = (0..200)
        .filter(|&t| c.decide(&fx.ctx(t, phase)).unwrap() == Axis::NorthSouth)
        .collect();
    assert_eq!(ns_ticks.len(), 20);
    assert_eq!(ns_ticks[0], 70);
    assert_eq!(ns_ticks[10], 150);
}

#[test]
fn test_build_controller_from_params() {
    let c = build_controller(&IntersectionParams::default()).unwrap();
    assert_eq!(c.label(), "static_imbalanced");
    let c = build_controller(&IntersectionParams::mitigated()).unwrap();
    assert_eq!(c.label(), "reward_greedy");
    let c = build_controller(&IntersectionParams::fixed_cycle(50)).unwrap();
    assert_eq!(c.label(), "fixed_cycle");
}

#[test]
fn test_build_external_without_port_fails() {
    let params = IntersectionParams::default().with_controller(ControllerKind::External);
    assert_eq!(
        build_controller(&params).err(),
        Some(ConfigError::MissingDecisionPort)
    );
}

// ---------------------------------------------------------------------------
// Reward greedy
// ---------------------------------------------------------------------------

#[test]
fn test_greedy_holds_when_nothing_waits() {
    let fx = Fixture::new();
    let mut c = RewardGreedyController;
    assert_eq!(
        c.decide(&fx.ctx(10, settled(Axis::EastWest))).unwrap(),
        Axis::EastWest
    );
}

#[test]
fn test_greedy_switches_to_serve_waiting_axis() {
    let mut fx = Fixture::new();
    fx.queues.set_approach(Approach::North, 6);
    fx.queues.set_approach(Approach::South, 6);
    let mut c = RewardGreedyController;
    assert_eq!(
        c.decide(&fx.ctx(10, settled(Axis::EastWest))).unwrap(),
        Axis::NorthSouth
    );
}

#[test]
fn test_greedy_respects_min_green_penalty() {
    let mut fx = Fixture::new();
    fx.queues.set_approach(Approach::North, 1);
    fx.queues.set_approach(Approach::East, 1);
    fx.params.reward = RewardWeights {
        safety: 3.0,
        ..RewardWeights::default()
    };
    let young = PhaseState {
        green: Axis::EastWest,
        ticks_since_phase_start: 1,
    };
    let mut c = RewardGreedyController;
    assert_eq!(c.decide(&fx.ctx(10, young)).unwrap(), Axis::EastWest);
}

#[test]
fn test_greedy_fairness_weight_breaks_throughput_tie() {
    // Equal throughput either way; only the fairness term differs.
    let mut fx = Fixture::new();
    fx.queues.set_approach(Approach::North, 3);
    fx.queues.set_approach(Approach::East, 3);
    fx.fairness = FairnessAccumulator {
        cum_wait_ew: 0.0,
        cum_wait_ns: 200.0,
    };
    fx.params.reward.switch_penalty = 0.0;
    let mut c = RewardGreedyController;
    let phase = settled(Axis::EastWest);

    fx.params.reward.fairness = 0.0;
    assert_eq!(c.decide(&fx.ctx(10, phase)).unwrap(), Axis::EastWest);

    fx.params.reward.fairness = 0.08;
    assert_eq!(c.decide(&fx.ctx(10, phase)).unwrap(), Axis::NorthSouth);
}

// ---------------------------------------------------------------------------
// External / scripted
// ---------------------------------------------------------------------------

#[test]
fn test_external_maps_actions() {
    let fx = Fixture::new();
    let port: Arc<dyn DecisionPort> =
        Arc::new(|_: &Observation| -> Result<i64, DecisionError> { Ok(1) });
    let mut c = ExternalController::new(port);
    assert_eq!(
        c.decide(&fx.ctx(0, settled(Axis::EastWest))).unwrap(),
        Axis::NorthSouth
    );
    assert!(c.offload().is_none());
}

#[test]
fn test_external_rejects_out_of_range_action() {
    let fx = Fixture::new();
    let port: Arc<dyn DecisionPort> =
        Arc::new(|_: &Observation| -> Result<i64, DecisionError> { Ok(7) });
    let mut c = ExternalController::new(port);
    assert_eq!(
        c.decide(&fx.ctx(0, settled(Axis::EastWest))),
        Err(DecisionError::InvalidAction(7))
    );
}

#[test]
fn test_external_propagates_port_failure() {
    let fx = Fixture::new();
    let port: Arc<dyn DecisionPort> = Arc::new(|_: &Observation| -> Result<i64, DecisionError> {
        Err(DecisionError::Unavailable("connection refused".into()))
    });
    let mut c = ExternalController::new(port);
    let err = c.decide(&fx.ctx(0, settled(Axis::EastWest))).unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_offloaded_external_exposes_port() {
    let port: Arc<dyn DecisionPort> =
        Arc::new(|_: &Observation| -> Result<i64, DecisionError> { Ok(0) });
    let c = ExternalController::offloaded(port, std::time::Duration::from_millis(5));
    let offload = c.offload().unwrap();
    assert_eq!(offload.timeout, std::time::Duration::from_millis(5));
}

#[test]
fn test_scripted_replays_then_runs_out() {
    let fx = Fixture::new();
    let mut c = ScriptedController::new(vec![Axis::NorthSouth, Axis::EastWest]);
    let phase = settled(Axis::EastWest);
    assert_eq!(c.decide(&fx.ctx(0, phase)).unwrap(), Axis::NorthSouth);
    assert_eq!(c.decide(&fx.ctx(1, phase)).unwrap(), Axis::EastWest);
    assert!(matches!(
        c.decide(&fx.ctx(2, phase)),
        Err(DecisionError::Unavailable(_))
    ));
}
