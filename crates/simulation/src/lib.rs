//! Two-phase signalised intersection simulation.
//!
//! Four approaches (N, S, E, W) share one junction; exactly one axis
//! (north-south or east-west) is green at a time. Each [`episode::Episode`]
//! draws stochastic arrivals, asks its [`phase_controller::PhaseController`]
//! which axis should be green, serves that axis, and tracks cumulative
//! per-axis waiting, fairness, safety risk flags and a weighted reward.
//!
//! The [`IntersectionPlugin`] drives any number of isolated episodes on
//! Bevy's `FixedUpdate` schedule; [`agent_protocol`] exposes the same
//! registry over newline-delimited JSON.

use bevy::prelude::*;

pub mod agent_protocol;
pub mod axis;
pub mod config;
pub mod episode;
pub mod evaluation;
pub mod fairness;
pub mod intersection_params;
pub mod observation;
pub mod phase;
pub mod phase_controller;
pub mod plugin;
pub mod queue_model;
pub mod registry;
pub mod remote_decision;
pub mod replay;
pub mod reward;
pub mod safety;
pub mod scenario;
pub mod sim_rng;
pub mod simulation_invariants;
pub mod simulation_sets;
pub mod state_hash;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use plugin::{ClockControl, EpisodeTicked, IntersectionPlugin, LatestSnapshots};
pub use simulation_sets::SimulationSet;

/// Headless app with the intersection driver and nothing else. Used by the
/// CLI's batch modes and by the test harness.
pub fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(IntersectionPlugin);
    app
}
