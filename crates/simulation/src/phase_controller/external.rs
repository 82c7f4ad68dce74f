use std::sync::Arc;
use std::time::Duration;

use crate::axis::Axis;
use crate::config::DEFAULT_DECISION_TIMEOUT;

use super::{DecisionContext, DecisionError, DecisionPort, OffloadedPort, PhaseController};

/// Adapter from an opaque [`DecisionPort`] to the controller interface.
///
/// Inline controllers call the port on the stepping thread. Offloaded ones
/// are resolved by the Bevy driver on the async compute pool; calling
/// `decide` on them directly still works and blocks.
#[derive(Clone)]
pub struct ExternalController {
    port: Arc<dyn DecisionPort>,
    timeout: Option<Duration>,
}

impl ExternalController {
    pub fn new(port: Arc<dyn DecisionPort>) -> Self {
        Self {
            port,
            timeout: None,
        }
    }

    pub fn offloaded(port: Arc<dyn DecisionPort>, timeout: Duration) -> Self {
        Self {
            port,
            timeout: Some(timeout),
        }
    }

    pub fn offloaded_default(port: Arc<dyn DecisionPort>) -> Self {
        Self::offloaded(port, DEFAULT_DECISION_TIMEOUT)
    }
}

/// Map a raw port answer onto an axis.
pub fn resolve_action(result: Result<i64, DecisionError>) -> Result<Axis, DecisionError> {
    let action = result?;
    Axis::from_action(action).ok_or(DecisionError::InvalidAction(action))
}

impl PhaseController for ExternalController {
    fn label(&self) -> &'static str {
        "external"
    }

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError> {
        resolve_action(self.port.decide(&ctx.observation))
    }

    fn offload(&self) -> Option<OffloadedPort> {
        self.timeout.map(|timeout| OffloadedPort {
            port: Arc::clone(&self.port),
            timeout,
        })
    }
}
