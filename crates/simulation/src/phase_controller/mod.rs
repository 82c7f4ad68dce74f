//! Phase controllers decide which axis is green on the next tick.
//!
//! Every policy sits behind [`PhaseController`], so the episode clock never
//! knows whether it is talking to a fixed schedule, a lookahead heuristic or
//! an external policy behind a [`DecisionPort`].

pub mod external;
pub mod fixed_cycle;
pub mod reward_greedy;
pub mod scripted;
pub mod static_imbalanced;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::axis::Axis;
use crate::fairness::FairnessAccumulator;
use crate::intersection_params::{ConfigError, ControllerKind, IntersectionParams};
use crate::observation::Observation;
use crate::phase::PhaseState;
use crate::queue_model::QueueModel;
use crate::scenario::TrafficScenario;

pub use external::ExternalController;
pub use fixed_cycle::FixedCycleController;
pub use reward_greedy::RewardGreedyController;
pub use scripted::ScriptedController;
pub use static_imbalanced::StaticImbalancedController;

/// Read-only view of the episode handed to a controller. Queues are the
/// post-arrival queues of the tick being decided.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Ticks completed before this one.
    pub tick: u64,
    pub phase: PhaseState,
    pub queues: &'a QueueModel,
    pub fairness: &'a FairnessAccumulator,
    pub scenario: &'a TrafficScenario,
    pub params: &'a IntersectionParams,
    pub observation: Observation,
}

/// Why a decision could not be made. Always recovered by holding the phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    Unavailable(String),
    Timeout,
    InvalidAction(i64),
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionError::Unavailable(reason) => write!(f, "decision unavailable: {reason}"),
            DecisionError::Timeout => write!(f, "decision timed out"),
            DecisionError::InvalidAction(action) => {
                write!(f, "decision port returned invalid action {action}")
            }
        }
    }
}

impl std::error::Error for DecisionError {}

/// An external policy: observation in, action 0 (EW) or 1 (NS) out.
///
/// Implementations may block (e.g. on a network call); the Bevy driver can
/// offload them to the async compute pool.
pub trait DecisionPort: Send + Sync {
    fn decide(&self, observation: &Observation) -> Result<i64, DecisionError>;
}

impl<F> DecisionPort for F
where
    F: Fn(&Observation) -> Result<i64, DecisionError> + Send + Sync,
{
    fn decide(&self, observation: &Observation) -> Result<i64, DecisionError> {
        self(observation)
    }
}

/// A port the driver should call off-thread, with its deadline.
#[derive(Clone)]
pub struct OffloadedPort {
    pub port: Arc<dyn DecisionPort>,
    pub timeout: Duration,
}

pub trait PhaseController: Send + Sync {
    fn label(&self) -> &'static str;

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError>;

    /// Called on episode reset.
    fn reset(&mut self) {}

    /// `Some` when decisions should be resolved asynchronously by the driver
    /// instead of through [`PhaseController::decide`].
    fn offload(&self) -> Option<OffloadedPort> {
        None
    }
}

/// Build the controller named by `params.controller`.
///
/// `ControllerKind::External` needs a port and must be constructed with
/// [`ExternalController`] directly.
pub fn build_controller(
    params: &IntersectionParams,
) -> Result<Box<dyn PhaseController>, ConfigError> {
    let controller: Box<dyn PhaseController> = match &params.controller {
        ControllerKind::FixedCycle { period } => {
            Box::new(FixedCycleController::new(*period, params.initial_phase))
        }
        ControllerKind::StaticImbalanced { windows } => {
            Box::new(StaticImbalancedController::new(windows.clone()))
        }
        ControllerKind::RewardGreedy => Box::new(RewardGreedyController),
        ControllerKind::External => return Err(ConfigError::MissingDecisionPort),
    };
    Ok(controller)
}

#[cfg(test)]
mod tests;
