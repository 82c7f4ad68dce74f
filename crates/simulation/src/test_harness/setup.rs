//! Builder methods for registering episodes in integration tests.

use std::sync::Arc;
use std::time::Duration;

use crate::intersection_params::{ControllerKind, IntersectionParams};
use crate::phase_controller::external::ExternalController;
use crate::phase_controller::DecisionPort;
use crate::registry::{AgentKind, EpisodeId, EpisodeRegistry};
use crate::scenario::TrafficScenario;

use super::TestIntersection;

impl TestIntersection {
    // -----------------------------------------------------------------------
    // Episode registration
    // -----------------------------------------------------------------------

    /// Register an episode with one of the preset agents.
    pub fn spawn_agent(&mut self, kind: AgentKind, seed: u64) -> EpisodeId {
        self.registry_mut()
            .init_episode(kind, Some(seed))
            .expect("preset params are valid")
            .episode_id
    }

    /// Register an episode with explicit params.
    pub fn spawn_params(&mut self, params: IntersectionParams, seed: u64) -> EpisodeId {
        self.registry_mut()
            .init_params(params, Some(seed))
            .expect("test params should be valid")
            .episode_id
    }

    /// Register an episode on a fixed scenario.
    pub fn spawn_fixed(
        &mut self,
        params: IntersectionParams,
        ew_rate: f64,
        ns_rate: f64,
        seed: u64,
    ) -> EpisodeId {
        self.spawn_params(
            params.with_scenario(TrafficScenario::with_rates(ew_rate, ns_rate)),
            seed,
        )
    }

    /// Register an episode whose decisions come from `port`, called inline
    /// on the stepping thread.
    pub fn spawn_external(&mut self, port: Arc<dyn DecisionPort>, seed: u64) -> EpisodeId {
        let params = IntersectionParams::default().with_controller(ControllerKind::External);
        let controller = Box::new(ExternalController::new(port));
        self.registry_mut()
            .init_with(params, controller, Some(seed))
            .expect("external params are valid")
            .episode_id
    }

    /// Register an episode whose decisions come from `port`, called on the
    /// async compute pool with the given deadline.
    pub fn spawn_offloaded(
        &mut self,
        port: Arc<dyn DecisionPort>,
        timeout: Duration,
        seed: u64,
    ) -> EpisodeId {
        let params = IntersectionParams::default().with_controller(ControllerKind::External);
        let controller = Box::new(ExternalController::offloaded(port, timeout));
        self.registry_mut()
            .init_with(params, controller, Some(seed))
            .expect("external params are valid")
            .episode_id
    }

    fn registry_mut(&mut self) -> bevy::prelude::Mut<'_, EpisodeRegistry> {
        self.app.world_mut().resource_mut::<EpisodeRegistry>()
    }
}
