//! Runtime invariant validation for episode state.
//!
//! [`check_tick`] runs inside every step and returns the first violation it
//! finds; the episode that produced it is faulted. The ECS side counts
//! faults reported through [`EpisodeTicked`] so integration tests can
//! assert that none occurred.
//!
//! Validated invariants:
//! 1. **Queue bounds**: every approach queue is within `[0, max_queue]`.
//! 2. **Vehicle conservation**: queued before service = served + remaining.
//! 3. **Monotone waits**: cumulative per-axis waits never decrease.
//! 4. **Finite metrics**: fairness gap and cumulative reward are finite and
//!    the gap is non-negative.

use bevy::prelude::*;

use crate::axis::Approach;
use crate::episode::{EpisodeState, EpisodeStatus, InvariantViolation};
use crate::plugin::EpisodeTicked;
use crate::queue_model::ServiceOutcome;
use crate::SimulationSet;

pub fn check_tick(
    prev: &EpisodeState,
    next: &EpisodeState,
    queued_before_service: u32,
    service: ServiceOutcome,
) -> Result<(), InvariantViolation> {
    let cap = next.queues.max_queue();
    for approach in Approach::ALL {
        let length = next.queues.approach(approach);
        if length > cap {
            return Err(InvariantViolation::QueueOverCap {
                approach,
                length,
                cap,
            });
        }
    }

    if service.served.checked_add(service.remaining) != Some(queued_before_service) {
        return Err(InvariantViolation::QueueUnderflow {
            queued: queued_before_service,
            served: service.served,
            remaining: service.remaining,
        });
    }

    for (axis, before, after) in [
        ("EW", prev.fairness.cum_wait_ew, next.fairness.cum_wait_ew),
        ("NS", prev.fairness.cum_wait_ns, next.fairness.cum_wait_ns),
    ] {
        if after < before {
            return Err(InvariantViolation::WaitDecreased {
                axis,
                before,
                after,
            });
        }
    }

    let gap = next.metrics.gap;
    if !gap.is_finite() || gap < 0.0 {
        return Err(InvariantViolation::NonFiniteMetric {
            metric: "fairness_gap",
            value: gap,
        });
    }
    if !next.cumulative_reward.is_finite() {
        return Err(InvariantViolation::NonFiniteMetric {
            metric: "cumulative_reward",
            value: next.cumulative_reward,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Violation counter
// ---------------------------------------------------------------------------

/// Faults observed by the driver since startup.
#[derive(Resource, Default, Debug)]
pub struct InvariantViolations {
    pub faulted_episodes: u32,
    /// Most recent fault message.
    pub last: Option<String>,
}

fn count_faulted_episodes(
    mut ticked: EventReader<EpisodeTicked>,
    mut violations: ResMut<InvariantViolations>,
) {
    for event in ticked.read() {
        if event.status == EpisodeStatus::Faulted {
            debug!(
                "Counting fault of episode {} at tick {}",
                event.id, event.tick
            );
            violations.faulted_episodes += 1;
            violations.last = event.error.clone();
        }
    }
}

pub struct SimulationInvariantsPlugin;

impl Plugin for SimulationInvariantsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InvariantViolations>().add_systems(
            FixedUpdate,
            count_faulted_episodes.in_set(SimulationSet::Publish),
        );
    }
}
