//! Offloaded external decisions.
//!
//! Episodes whose controller exposes an [`OffloadedPort`] have their port
//! called on the `AsyncComputeTaskPool` instead of on the stepping thread.
//! Dispatch stages the tick's arrivals on the episode first, so the port
//! sees the same post-arrival observation an inline controller would. The
//! episode blocks (skips ticks) until the task resolves or
//! its wall-clock deadline passes, in which case the tick is taken with
//! `DecisionError::Timeout` and the phase is held.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use crate::axis::Axis;
use crate::phase_controller::external::resolve_action;
use crate::phase_controller::DecisionError;
use crate::plugin::ClockControl;
use crate::registry::{EpisodeId, EpisodeRegistry};

type Decision = Result<Axis, DecisionError>;

/// One in-flight port call.
pub struct PendingDecision {
    task: Task<Decision>,
    started: Instant,
    timeout: Duration,
    /// Tick the decision is for; stale results are discarded.
    tick: u64,
}

impl PendingDecision {
    /// `Some` once the task finished or the deadline passed.
    fn poll(&mut self) -> Option<Decision> {
        if let Some(decision) = block_on(futures_lite::future::poll_once(&mut self.task)) {
            return Some(decision);
        }
        if self.started.elapsed() >= self.timeout {
            return Some(Err(DecisionError::Timeout));
        }
        None
    }
}

/// Outstanding offloaded decisions, at most one per episode.
#[derive(Resource, Default)]
pub struct PendingDecisions {
    tasks: BTreeMap<EpisodeId, PendingDecision>,
}

impl PendingDecisions {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: EpisodeId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Drop every outstanding task. Dropping a `Task` cancels it.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Drop the outstanding task for `id`, if any.
    pub fn cancel(&mut self, id: EpisodeId) {
        self.tasks.remove(&id);
    }

    /// Resolved decision for `id` at `tick`, removing the pending entry.
    /// `None` while the task is still running inside its deadline.
    pub fn take_resolved(&mut self, id: EpisodeId, tick: u64) -> Option<Decision> {
        let pending = self.tasks.get_mut(&id)?;
        if pending.tick != tick {
            // Episode was reset or stepped elsewhere; ask again.
            self.tasks.remove(&id);
            return None;
        }
        let decision = pending.poll()?;
        if matches!(decision, Err(DecisionError::Timeout)) {
            warn!("Episode {} tick {}: offloaded decision timed out", id, tick);
        }
        self.tasks.remove(&id);
        Some(decision)
    }
}

/// Spawn a port call for every running offloaded episode without one.
pub fn dispatch_offloaded_decisions(
    control: Res<ClockControl>,
    mut registry: ResMut<EpisodeRegistry>,
    mut pending: ResMut<PendingDecisions>,
) {
    if !control.is_running() {
        return;
    }
    let pool = AsyncComputeTaskPool::get();
    for (id, episode) in registry.iter_mut() {
        if !episode.is_running() || pending.contains(id) {
            continue;
        }
        let Some(offload) = episode.offload() else {
            continue;
        };
        let observation = episode.stage_tick();
        let port = offload.port;
        let task = pool.spawn(async move { resolve_action(port.decide(&observation)) });
        pending.tasks.insert(
            id,
            PendingDecision {
                task,
                started: Instant::now(),
                timeout: offload.timeout,
                tick: episode.state().tick,
            },
        );
    }
}

/// Cancel outstanding tasks for episodes that no longer exist or stopped
/// running, and everything once the clock is stopped.
pub fn prune_pending_decisions(
    control: Res<ClockControl>,
    registry: Res<EpisodeRegistry>,
    mut pending: ResMut<PendingDecisions>,
) {
    if control.is_stopped() {
        if !pending.is_empty() {
            info!("Clock stopped; cancelling {} pending decisions", pending.len());
        }
        pending.clear();
        return;
    }
    pending.tasks.retain(|id, _| {
        registry
            .get(*id)
            .map(|episode| episode.is_running())
            .unwrap_or(false)
    });
}
