//! Bevy driver: steps every registered episode once per fixed tick.
//!
//! `IntersectionPlugin` sets the `FixedUpdate` cadence to 160 ms and wires
//! the Decide → Advance → Publish chain. Each tick runs to completion;
//! the only suspension point is an offloaded external decision, during
//! which the owning episode simply does not advance.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::axis::Axis;
use crate::config::TICK_INTERVAL;
use crate::episode::{EpisodeState, EpisodeStatus};
use crate::registry::{EpisodeId, EpisodeRegistry};
use crate::remote_decision::{
    dispatch_offloaded_decisions, prune_pending_decisions, PendingDecisions,
};
use crate::simulation_invariants::SimulationInvariantsPlugin;
use crate::SimulationSet;

// ---------------------------------------------------------------------------
// Resources and events
// ---------------------------------------------------------------------------

/// Run/pause/stop switch for the driver. `stop` is terminal and idempotent.
#[derive(Resource, Debug, Default, Clone)]
pub struct ClockControl {
    paused: bool,
    stopped: bool,
}

impl ClockControl {
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns `true` only for the call that actually stopped the clock.
    pub fn stop(&mut self) -> bool {
        let first = !self.stopped;
        self.stopped = true;
        first
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_running(&self) -> bool {
        !self.paused && !self.stopped
    }
}

/// Latest published snapshot per episode, for rendering/UI consumers.
#[derive(Resource, Debug, Default)]
pub struct LatestSnapshots {
    pub snapshots: BTreeMap<EpisodeId, EpisodeState>,
}

impl LatestSnapshots {
    pub fn get(&self, id: EpisodeId) -> Option<&EpisodeState> {
        self.snapshots.get(&id)
    }
}

/// Emitted once for every tick an episode takes, and once when it faults.
#[derive(Event, Debug, Clone)]
pub struct EpisodeTicked {
    pub id: EpisodeId,
    pub tick: u64,
    /// Axis that was green this tick; `None` for a fault.
    pub action: Option<Axis>,
    pub reward: f64,
    pub status: EpisodeStatus,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn advance_episodes(
    control: Res<ClockControl>,
    mut registry: ResMut<EpisodeRegistry>,
    mut pending: ResMut<PendingDecisions>,
    mut ticked: EventWriter<EpisodeTicked>,
) {
    if !control.is_running() {
        return;
    }
    for (id, episode) in registry.iter_mut() {
        if !episode.is_running() {
            continue;
        }
        let result = if episode.offload().is_some() {
            if !episode.is_staged() {
                // Reset since dispatch; the task answered a stale observation.
                pending.cancel(id);
                continue;
            }
            match pending.take_resolved(id, episode.state().tick) {
                Some(decision) => episode.step_with_decision(decision),
                None => continue,
            }
        } else {
            episode.step()
        };

        let state = episode.state();
        ticked.send(EpisodeTicked {
            id,
            tick: state.tick,
            action: result.as_ref().ok().map(|r| r.action),
            reward: result.as_ref().map(|r| r.reward).unwrap_or(0.0),
            status: state.status,
            error: state.error.clone(),
        });
    }
}

fn publish_snapshots(
    registry: Res<EpisodeRegistry>,
    mut ticked: EventReader<EpisodeTicked>,
    mut latest: ResMut<LatestSnapshots>,
) {
    for event in ticked.read() {
        if let Ok(episode) = registry.get(event.id) {
            latest.snapshots.insert(event.id, episode.snapshot());
        }
    }
    latest
        .snapshots
        .retain(|id, _| registry.get(*id).is_ok());
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct IntersectionPlugin;

impl Plugin for IntersectionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_duration(TICK_INTERVAL))
            .init_resource::<EpisodeRegistry>()
            .init_resource::<ClockControl>()
            .init_resource::<PendingDecisions>()
            .init_resource::<LatestSnapshots>()
            .add_event::<EpisodeTicked>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Decide,
                    SimulationSet::Advance,
                    SimulationSet::Publish,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (prune_pending_decisions, dispatch_offloaded_decisions)
                    .chain()
                    .in_set(SimulationSet::Decide),
            )
            .add_systems(FixedUpdate, advance_episodes.in_set(SimulationSet::Advance))
            .add_systems(
                FixedUpdate,
                publish_snapshots.in_set(SimulationSet::Publish),
            );

        app.add_plugins(SimulationInvariantsPlugin);
    }
}
