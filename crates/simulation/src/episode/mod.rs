//! A single simulation instance: params, RNG stream, controller and the
//! latest immutable [`EpisodeState`].
//!
//! Episodes share nothing. Each owns its own `SimRng` and controller, so two
//! episodes (e.g. baseline and mitigated side by side) can be stepped from
//! the same or different clocks without coordination.

pub mod clock;
pub mod error;
pub mod state;

use bevy::log::{error, info, warn};
use serde::Serialize;

use crate::axis::Axis;
use crate::intersection_params::{ConfigError, IntersectionParams};
use crate::observation::{Observation, StepInfo};
use crate::phase_controller::{build_controller, DecisionError, OffloadedPort, PhaseController};
use crate::replay::{ReplayFile, ReplayRecorder};
use crate::sim_rng::SimRng;
use crate::state_hash::compute_state_hash;

pub use clock::{draw_arrivals, pre_tick_observation, resolve_tick, StagedTick, TickOutcome};
pub use error::{InvariantViolation, StepError};
pub use state::{EpisodeState, EpisodeStatus};

/// What a caller gets back from one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub action: Axis,
    /// Observation for the next decision.
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

pub struct Episode {
    tag: String,
    params: IntersectionParams,
    seed: u64,
    rng: SimRng,
    state: EpisodeState,
    controller: Box<dyn PhaseController>,
    last_info: Option<StepInfo>,
    /// Arrivals already drawn for the next tick, awaiting a decision.
    staged: Option<StagedTick>,
    fault: Option<InvariantViolation>,
    recorder: Option<ReplayRecorder>,
}

impl Episode {
    /// Build an episode running the controller named in `params`.
    pub fn new(params: IntersectionParams, seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let controller = build_controller(&params)?;
        Ok(Self::assemble(params, controller, seed))
    }

    /// Build an episode around an explicit controller (external ports,
    /// scripted replays).
    pub fn with_controller(
        params: IntersectionParams,
        controller: Box<dyn PhaseController>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::assemble(params, controller, seed))
    }

    fn assemble(params: IntersectionParams, controller: Box<dyn PhaseController>, seed: u64) -> Self {
        let mut rng = SimRng::from_seed_u64(seed);
        let scenario = params.arrival.sample(&mut rng);
        let state = EpisodeState::initial(&params, scenario);
        Self {
            tag: format!("seed-{seed}"),
            params,
            seed,
            rng,
            state,
            controller,
            last_info: None,
            staged: None,
            fault: None,
            recorder: None,
        }
    }

    /// Name used in log lines.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Full re-initialisation from the original seed. Accumulators, RNG
    /// stream, scenario, fault and controller state are all discarded.
    pub fn reset(&mut self) -> &EpisodeState {
        self.rng = SimRng::from_seed_u64(self.seed);
        let scenario = self.params.arrival.sample(&mut self.rng);
        self.state = EpisodeState::initial(&self.params, scenario);
        self.controller.reset();
        self.last_info = None;
        self.staged = None;
        self.fault = None;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.restart();
        }
        info!(
            "Episode {} reset (seed {}, controller {})",
            self.tag,
            self.seed,
            self.controller.label()
        );
        &self.state
    }

    /// Advance one tick, asking the controller for the decision.
    pub fn step(&mut self) -> Result<StepResult, StepError> {
        self.ensure_steppable()?;
        let staged = self.take_staged();
        let controller = &mut self.controller;
        let outcome = resolve_tick(&self.state, &self.params, staged, |ctx| {
            controller.decide(ctx)
        });
        self.apply(outcome)
    }

    /// Advance one tick with a decision resolved elsewhere (offloaded port,
    /// timeout). An `Err` holds the current phase.
    pub fn step_with_decision(
        &mut self,
        decision: Result<Axis, DecisionError>,
    ) -> Result<StepResult, StepError> {
        self.ensure_steppable()?;
        let staged = self.take_staged();
        let outcome = resolve_tick(&self.state, &self.params, staged, move |_| decision);
        self.apply(outcome)
    }

    /// Draw the next tick's arrivals now and return the observation the
    /// decision should be made on. Idempotent until the tick is taken.
    pub fn stage_tick(&mut self) -> Observation {
        match self.staged {
            Some(staged) => staged.observation,
            None => {
                let staged = draw_arrivals(&self.state, &self.params, &mut self.rng);
                self.staged = Some(staged);
                staged.observation
            }
        }
    }

    /// Whether arrivals for the next tick have been drawn.
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    fn take_staged(&mut self) -> StagedTick {
        match self.staged.take() {
            Some(staged) => staged,
            None => draw_arrivals(&self.state, &self.params, &mut self.rng),
        }
    }

    fn ensure_steppable(&self) -> Result<(), StepError> {
        if let Some(violation) = &self.fault {
            return Err(StepError::Faulted(violation.clone()));
        }
        if self.state.is_done() {
            return Err(StepError::Finished);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        outcome: Result<TickOutcome, InvariantViolation>,
    ) -> Result<StepResult, StepError> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(violation) => {
                error!(
                    "Episode {} faulted at tick {}: {}",
                    self.tag, self.state.tick, violation
                );
                self.state.status = EpisodeStatus::Faulted;
                self.state.error = Some(violation.to_string());
                self.fault = Some(violation.clone());
                return Err(StepError::Faulted(violation));
            }
        };

        if let Some(err) = &outcome.degraded {
            warn!(
                "Episode {} tick {}: {}; holding {}",
                self.tag,
                outcome.state.tick,
                err,
                outcome.action.label()
            );
        }

        self.state = outcome.state;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(self.state.tick - 1, outcome.action, outcome.degraded.is_some());
        }
        if self.state.is_done() {
            info!(
                "Episode {} finished: reward {:.3}, gap {:.3}, EW green {:.1}%",
                self.tag,
                self.state.cumulative_reward,
                self.state.metrics.gap,
                self.state.green_pct_ew * 100.0
            );
        }
        self.last_info = Some(outcome.info.clone());

        Ok(StepResult {
            action: outcome.action,
            observation: self.observation(),
            reward: outcome.reward,
            done: self.state.is_done(),
            info: outcome.info,
        })
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    pub fn snapshot(&self) -> EpisodeState {
        self.state.clone()
    }

    /// Observation for the next decision, before its arrivals are drawn.
    pub fn observation(&self) -> Observation {
        pre_tick_observation(&self.state, &self.params)
    }

    /// Info for the most recent tick; an all-zero record before the first.
    pub fn info(&self) -> StepInfo {
        match &self.last_info {
            Some(info) => info.clone(),
            None => StepInfo::initial(&self.state),
        }
    }

    pub fn params(&self) -> &IntersectionParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn controller_label(&self) -> &'static str {
        self.controller.label()
    }

    pub fn offload(&self) -> Option<OffloadedPort> {
        self.controller.offload()
    }

    pub fn is_running(&self) -> bool {
        self.state.status == EpisodeStatus::Running
    }

    pub fn fault(&self) -> Option<&InvariantViolation> {
        self.fault.as_ref()
    }

    pub fn state_hash(&self) -> u64 {
        compute_state_hash(&self.state, &self.rng)
    }

    // -----------------------------------------------------------------------
    // Replay capture
    // -----------------------------------------------------------------------

    /// Start recording applied axes from the current tick onwards. Call
    /// right after creation or reset to capture a full episode.
    pub fn start_recording(&mut self) {
        self.recorder = Some(ReplayRecorder::new(
            self.seed,
            self.controller.label(),
            &self.params,
        ));
    }

    /// Stop recording and seal the replay with the current state hash.
    pub fn finish_recording(&mut self) -> Option<ReplayFile> {
        let hash = self.state_hash();
        let tick = self.state.tick;
        self.recorder.take().map(|r| r.finish(tick, hash))
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut EpisodeState {
        &mut self.state
    }
}
