use crate::axis::Axis;
use crate::intersection_params::TickWindow;

use super::{DecisionContext, DecisionError, PhaseController};

/// Illustrative stand-in for a reward-hacked policy: EW stays green except
/// inside a few short, fixed NS windows.
#[derive(Debug, Clone)]
pub struct StaticImbalancedController {
    windows: Vec<TickWindow>,
}

impl StaticImbalancedController {
    pub fn new(windows: Vec<TickWindow>) -> Self {
        Self { windows }
    }

    pub fn axis_at(&self, tick: u64) -> Axis {
        if self.windows.iter().any(|w| w.contains(tick)) {
            Axis::NorthSouth
        } else {
            Axis::EastWest
        }
    }
}

impl PhaseController for StaticImbalancedController {
    fn label(&self) -> &'static str {
        "static_imbalanced"
    }

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError> {
        Ok(self.axis_at(ctx.tick))
    }
}
