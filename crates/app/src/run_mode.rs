//! Side-by-side `run` mode: baseline and mitigated episodes on the same
//! seed, driven by the fixed-timestep clock until both reach the horizon.

use std::time::Duration;

use anyhow::Result;
use bevy::prelude::*;
use serde::Serialize;

use simulation::config::TICK_INTERVAL;
use simulation::episode::EpisodeState;
use simulation::intersection_params::IntersectionParams;
use simulation::registry::{EpisodeId, EpisodeRegistry};
use simulation::{ClockControl, EpisodeTicked};

const FRAME: Duration = Duration::from_millis(16);

/// Final figures for one episode of the comparison.
#[derive(Debug, Serialize)]
pub struct EpisodeSummary {
    pub label: String,
    pub episode_id: EpisodeId,
    pub seed: u64,
    pub ticks: u64,
    pub status: String,
    pub reward: f64,
    pub wait_ns: f64,
    pub wait_ew: f64,
    pub fairness_gap: f64,
    pub green_pct_ew: f64,
    pub safety_violations: u64,
    pub decision_failures: u64,
}

impl EpisodeSummary {
    fn new(label: &str, id: EpisodeId, seed: u64, state: &EpisodeState) -> Self {
        Self {
            label: label.to_string(),
            episode_id: id,
            seed,
            ticks: state.tick,
            status: format!("{:?}", state.status),
            reward: state.cumulative_reward,
            wait_ns: state.metrics.wait_ns,
            wait_ew: state.metrics.wait_ew,
            fairness_gap: state.metrics.gap,
            green_pct_ew: state.green_pct_ew,
            safety_violations: state.safety_violations,
            decision_failures: state.decision_failures,
        }
    }
}

/// Stop the clock once nothing is left running.
fn stop_when_settled(registry: Res<EpisodeRegistry>, mut control: ResMut<ClockControl>) {
    if registry.iter().any(|(_, episode)| episode.is_running()) {
        return;
    }
    if control.stop() {
        info!("All episodes settled; stopping clock");
    }
}

fn log_progress(mut ticked: EventReader<EpisodeTicked>) {
    for event in ticked.read() {
        if event.tick % 50 == 0 {
            info!(
                "{} tick {}: reward {:.3} ({:?})",
                event.id, event.tick, event.reward, event.status
            );
        }
    }
}

/// Run `(label, params)` pairs side by side on one seed. `realtime` paces
/// ticks at the fixed 160 ms interval; otherwise the schedule is driven as
/// fast as possible.
pub fn run_side_by_side(
    configs: Vec<(String, IntersectionParams)>,
    seed: u64,
    realtime: bool,
) -> Result<Vec<EpisodeSummary>> {
    let mut app = simulation::headless_app();
    app.add_systems(
        FixedUpdate,
        (log_progress, stop_when_settled)
            .chain()
            .after(simulation::SimulationSet::Publish),
    );

    let mut ids = Vec::with_capacity(configs.len());
    {
        let mut registry = app.world_mut().resource_mut::<EpisodeRegistry>();
        for (label, params) in configs {
            let init = registry.init_params(params, Some(seed))?;
            info!("{} -> {}", label, init.episode_id);
            ids.push((label, init.episode_id));
        }
    }

    if realtime {
        info!(
            "Running {} episodes at {} ms per tick",
            ids.len(),
            TICK_INTERVAL.as_millis()
        );
        // `app.update()` runs `FixedUpdate` as often as virtual time allows.
        while !app.world().resource::<ClockControl>().is_stopped() {
            app.update();
            std::thread::sleep(FRAME);
        }
    } else {
        app.update();
        while !app.world().resource::<ClockControl>().is_stopped() {
            app.world_mut().run_schedule(FixedUpdate);
        }
    }

    let registry = app.world().resource::<EpisodeRegistry>();
    let mut summaries = Vec::with_capacity(ids.len());
    for (label, id) in ids {
        let episode = registry.get(id)?;
        summaries.push(EpisodeSummary::new(&label, id, episode.seed(), episode.state()));
    }
    Ok(summaries)
}
