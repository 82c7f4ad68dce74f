use crate::axis::Axis;

use super::{DecisionContext, DecisionError, PhaseController};

/// Replays a recorded sequence of green axes, one per tick.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    axes: Vec<Axis>,
}

impl ScriptedController {
    pub fn new(axes: Vec<Axis>) -> Self {
        Self { axes }
    }
}

impl PhaseController for ScriptedController {
    fn label(&self) -> &'static str {
        "scripted"
    }

    fn decide(&mut self, ctx: &DecisionContext<'_>) -> Result<Axis, DecisionError> {
        usize::try_from(ctx.tick)
            .ok()
            .and_then(|i| self.axes.get(i).copied())
            .ok_or_else(|| {
                DecisionError::Unavailable(format!("script ends before tick {}", ctx.tick))
            })
    }
}
