//! Keyed pool of independent episodes.
//!
//! Each [`EpisodeId`] maps to exactly one [`Episode`]. Episodes never share
//! state, so a fault in one leaves every sibling untouched. The registry is
//! a Bevy resource for the clock driver but works standalone for the agent
//! protocol and tests.

use std::collections::BTreeMap;
use std::fmt;

use bevy::log::info;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::episode::{Episode, EpisodeState, StepError, StepResult};
use crate::intersection_params::{ConfigError, IntersectionParams};
use crate::observation::{Observation, StepInfo};
use crate::phase_controller::PhaseController;

/// Default base for derived seeds.
pub const DEFAULT_REGISTRY_SEED: u64 = 1000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EpisodeId(pub u64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

/// Built-in configurations selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Baseline,
    Mitigated,
    FixedCycle,
}

impl AgentKind {
    pub fn params(self) -> IntersectionParams {
        match self {
            AgentKind::Baseline => IntersectionParams::baseline(),
            AgentKind::Mitigated => IntersectionParams::mitigated(),
            AgentKind::FixedCycle => IntersectionParams::fixed_cycle(50),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentKind::Baseline => "baseline",
            AgentKind::Mitigated => "mitigated",
            AgentKind::FixedCycle => "fixed_cycle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    UnknownEpisode(EpisodeId),
    EpisodeFinished(EpisodeId),
    EpisodeFaulted(EpisodeId, String),
    Config(ConfigError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownEpisode(id) => write!(f, "unknown episode {id}"),
            RegistryError::EpisodeFinished(id) => {
                write!(f, "episode {id} has finished; reset it to run again")
            }
            RegistryError::EpisodeFaulted(id, reason) => {
                write!(f, "episode {id} faulted: {reason}")
            }
            RegistryError::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        RegistryError::Config(err)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResponse {
    pub episode_id: EpisodeId,
    pub seed: u64,
    pub observation: Observation,
    pub info: StepInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResponse {
    pub episode_id: EpisodeId,
    #[serde(flatten)]
    pub result: StepResult,
}

#[derive(Resource)]
pub struct EpisodeRegistry {
    episodes: BTreeMap<EpisodeId, Episode>,
    next_id: u64,
    seed_base: u64,
}

impl Default for EpisodeRegistry {
    fn default() -> Self {
        Self::with_seed_base(DEFAULT_REGISTRY_SEED)
    }
}

impl EpisodeRegistry {
    pub fn with_seed_base(seed_base: u64) -> Self {
        Self {
            episodes: BTreeMap::new(),
            next_id: 0,
            seed_base,
        }
    }

    fn allocate(&mut self, seed: Option<u64>) -> (EpisodeId, u64) {
        let id = EpisodeId(self.next_id);
        self.next_id += 1;
        let seed = seed.unwrap_or_else(|| self.seed_base.wrapping_add(id.0));
        (id, seed)
    }

    fn insert(&mut self, id: EpisodeId, episode: Episode) -> InitResponse {
        let episode = episode.with_tag(id.to_string());
        info!(
            "Episode {} created (controller {}, seed {})",
            id,
            episode.controller_label(),
            episode.seed()
        );
        let response = InitResponse {
            episode_id: id,
            seed: episode.seed(),
            observation: episode.observation(),
            info: episode.info(),
        };
        self.episodes.insert(id, episode);
        response
    }

    pub fn init_episode(
        &mut self,
        kind: AgentKind,
        seed: Option<u64>,
    ) -> Result<InitResponse, RegistryError> {
        self.init_params(kind.params(), seed)
    }

    /// Create an episode from explicit params; the controller comes from
    /// `params.controller`.
    pub fn init_params(
        &mut self,
        params: IntersectionParams,
        seed: Option<u64>,
    ) -> Result<InitResponse, RegistryError> {
        params.validate()?;
        let (id, seed) = self.allocate(seed);
        let episode = Episode::new(params, seed)?;
        Ok(self.insert(id, episode))
    }

    /// Create an episode around an explicit controller, e.g. an external
    /// decision port.
    pub fn init_with(
        &mut self,
        params: IntersectionParams,
        controller: Box<dyn PhaseController>,
        seed: Option<u64>,
    ) -> Result<InitResponse, RegistryError> {
        params.validate()?;
        let (id, seed) = self.allocate(seed);
        let episode = Episode::with_controller(params, controller, seed)?;
        Ok(self.insert(id, episode))
    }

    pub fn step(&mut self, id: EpisodeId) -> Result<StepResponse, RegistryError> {
        let episode = self.get_mut(id)?;
        let result = episode.step().map_err(|e| step_error(id, e))?;
        Ok(StepResponse {
            episode_id: id,
            result,
        })
    }

    pub fn snapshot(&self, id: EpisodeId) -> Result<EpisodeState, RegistryError> {
        self.get(id).map(Episode::snapshot)
    }

    pub fn reset_episode(&mut self, id: EpisodeId) -> Result<InitResponse, RegistryError> {
        let episode = self.get_mut(id)?;
        episode.reset();
        Ok(InitResponse {
            episode_id: id,
            seed: episode.seed(),
            observation: episode.observation(),
            info: episode.info(),
        })
    }

    pub fn remove(&mut self, id: EpisodeId) -> Result<(), RegistryError> {
        self.episodes
            .remove(&id)
            .map(|_| ())
            .ok_or(RegistryError::UnknownEpisode(id))
    }

    /// Drop every episode. Ids are not reused.
    pub fn reset_all(&mut self) {
        if !self.episodes.is_empty() {
            info!("Dropping {} episodes", self.episodes.len());
        }
        self.episodes.clear();
    }

    pub fn get(&self, id: EpisodeId) -> Result<&Episode, RegistryError> {
        self.episodes
            .get(&id)
            .ok_or(RegistryError::UnknownEpisode(id))
    }

    pub fn get_mut(&mut self, id: EpisodeId) -> Result<&mut Episode, RegistryError> {
        self.episodes
            .get_mut(&id)
            .ok_or(RegistryError::UnknownEpisode(id))
    }

    pub fn ids(&self) -> Vec<EpisodeId> {
        self.episodes.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EpisodeId, &Episode)> {
        self.episodes.iter().map(|(id, ep)| (*id, ep))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EpisodeId, &mut Episode)> {
        self.episodes.iter_mut().map(|(id, ep)| (*id, ep))
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

pub(crate) fn step_error(id: EpisodeId, err: StepError) -> RegistryError {
    match err {
        StepError::Finished => RegistryError::EpisodeFinished(id),
        StepError::Faulted(violation) => RegistryError::EpisodeFaulted(id, violation.to_string()),
    }
}
