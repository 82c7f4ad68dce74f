use crate::axis::Axis;

use super::{DecisionContext, DecisionError, PhaseController};

/// Alternates axes every `period` ticks regardless of queue state.
#[derive(Debug, Clone)]
pub struct FixedCycleController {
    period: u64,
    first: Axis,
}

impl FixedCycleController {
    pub fn new(period: u64, first: Axis) -> Self {
        Self {
            period: period.max(1),
            first,
        }
    }

    pub fn axis_at(&self, tick: u64) -> Axis {
        if (tick / self.period) % 2 == 0 {
            self.first
        } else {
            self.first.other()
        }
    }
}

impl PhaseController for FixedCycleController {
    fn label(&self) -> &'static str {
        "fixed_cycle"
    }

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError> {
        Ok(self.axis_at(ctx.tick))
    }
}
