//! A faulted episode stops on its own; siblings keep running and the fault
//! is counted once.

use crate::episode::EpisodeStatus;
use crate::registry::{AgentKind, EpisodeRegistry};
use crate::simulation_invariants::InvariantViolations;
use crate::test_harness::TestIntersection;

#[test]
fn test_fault_is_isolated_to_one_episode() {
    let mut sim = TestIntersection::new();
    let broken = sim.spawn_agent(AgentKind::Baseline, 1);
    let healthy = sim.spawn_agent(AgentKind::Baseline, 2);
    sim.tick(10);

    sim.world_mut()
        .resource_mut::<EpisodeRegistry>()
        .get_mut(broken)
        .unwrap()
        .state_mut()
        .fairness
        .cum_wait_ew = f64::NAN;
    sim.drain_ticked();
    sim.tick(1);

    let events = sim.drain_ticked();
    let fault = events.iter().find(|e| e.id == broken).unwrap();
    assert_eq!(fault.status, EpisodeStatus::Faulted);
    assert!(fault.action.is_none());
    assert!(fault.error.as_deref().unwrap().contains("fairness_gap"));

    sim.assert_faulted(broken);
    sim.assert_tick(broken, 10);
    sim.assert_tick(healthy, 11);

    sim.tick(300);
    sim.assert_faulted(broken);
    sim.assert_tick(broken, 10);
    sim.assert_done(healthy);

    let violations = sim.app().world().resource::<InvariantViolations>();
    assert_eq!(violations.faulted_episodes, 1);
    assert!(violations.last.is_some());
}

#[test]
fn test_faulted_episode_recovers_after_reset() {
    let mut sim = TestIntersection::new();
    let id = sim.spawn_agent(AgentKind::Mitigated, 3);
    sim.tick(5);
    sim.world_mut()
        .resource_mut::<EpisodeRegistry>()
        .get_mut(id)
        .unwrap()
        .state_mut()
        .fairness
        .cum_wait_ns = f64::INFINITY;
    sim.tick(2);
    sim.assert_faulted(id);
    assert!(sim.latest_snapshot(id).unwrap().is_faulted());

    sim.world_mut()
        .resource_mut::<EpisodeRegistry>()
        .reset_episode(id)
        .unwrap();
    sim.tick(200);
    sim.assert_done(id);
}

#[test]
fn test_stepping_faulted_episode_reports_reason() {
    let mut sim = TestIntersection::new();
    let id = sim.spawn_agent(AgentKind::Baseline, 3);
    sim.tick(1);
    let mut registry = sim.world_mut().resource_mut::<EpisodeRegistry>();
    registry.get_mut(id).unwrap().state_mut().fairness.cum_wait_ns = f64::NAN;
    let first = registry.step(id).unwrap_err().to_string();
    let second = registry.step(id).unwrap_err().to_string();
    assert!(first.contains("faulted"));
    assert_eq!(first, second);
}
