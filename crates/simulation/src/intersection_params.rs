//! Data-driven intersection parameters.
//!
//! Every tunable of an episode lives in [`IntersectionParams`]: where the
//! traffic scenario comes from, the queue cap and flow, reward weights,
//! safety thresholds, which controller runs, and the horizon. Params are
//! validated once when an episode is created and never clamped.
//!
//! Two presets cover the baseline (no fairness penalty, static imbalanced
//! controller) and mitigated (fairness-penalised greedy controller)
//! configurations. Any other weighting, such as a fairness weight of 0.1,
//! is a plain field override.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::config::{DEFAULT_HORIZON, DEFAULT_MAX_FLOW, DEFAULT_MAX_QUEUE};
use crate::reward::RewardWeights;
use crate::safety::SafetyParams;
use crate::scenario::{ScenarioSource, TrafficScenario};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid configuration. Reported at episode creation; never recovered.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability or bounded value fell outside its allowed interval.
    OutOfRange { field: &'static str, value: f64 },
    /// A sampling range was inverted or non-finite.
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    /// A reward weight was negative or non-finite.
    InvalidWeight { field: &'static str, value: f64 },
    /// A count that must be at least one was zero.
    NotPositive { field: &'static str },
    /// A static-imbalanced window with `start >= end`.
    EmptyWindow { start: u64, end: u64 },
    /// The external controller was selected but no decision port supplied.
    MissingDecisionPort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{field} = {value} is out of range")
            }
            ConfigError::InvalidRange { field, min, max } => {
                write!(f, "{field} range [{min}, {max}] is invalid")
            }
            ConfigError::InvalidWeight { field, value } => {
                write!(f, "{field} = {value} must be finite and non-negative")
            }
            ConfigError::NotPositive { field } => write!(f, "{field} must be at least 1"),
            ConfigError::EmptyWindow { start, end } => {
                write!(f, "window [{start}, {end}) is empty")
            }
            ConfigError::MissingDecisionPort => {
                write!(f, "external controller requires a decision port")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure loading params from JSON.
#[derive(Debug)]
pub enum ParamsError {
    Json(serde_json::Error),
    Config(ConfigError),
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::Json(e) => write!(f, "invalid params JSON: {e}"),
            ParamsError::Config(e) => write!(f, "invalid params: {e}"),
        }
    }
}

impl std::error::Error for ParamsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParamsError::Json(e) => Some(e),
            ParamsError::Config(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for ParamsError {
    fn from(e: serde_json::Error) -> Self {
        ParamsError::Json(e)
    }
}

impl From<ConfigError> for ParamsError {
    fn from(e: ConfigError) -> Self {
        ParamsError::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceParams {
    /// Per-approach queue cap.
    pub max_queue: u32,
    /// Vehicles served per approach per tick at full visibility.
    pub max_flow: u32,
}

impl Default for ServiceParams {
    fn default() -> Self {
        Self {
            max_queue: DEFAULT_MAX_QUEUE,
            max_flow: DEFAULT_MAX_FLOW,
        }
    }
}

impl ServiceParams {
    /// Effective flow under a scenario: `max(1, round(max_flow * visibility))`.
    pub fn flow(&self, scenario: &TrafficScenario) -> u32 {
        let scaled = (self.max_flow as f64 * scenario.visibility).round();
        (scaled as u32).max(1)
    }
}

// ---------------------------------------------------------------------------
// Controller selection
// ---------------------------------------------------------------------------

/// Half-open tick interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickWindow {
    pub start: u64,
    pub end: u64,
}

impl TickWindow {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, tick: u64) -> bool {
        self.start <= tick && tick < self.end
    }
}

pub fn default_imbalanced_windows() -> Vec<TickWindow> {
    vec![TickWindow::new(70, 80), TickWindow::new(150, 160)]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ControllerKind {
    /// Alternate axes every `period` ticks.
    FixedCycle { period: u64 },
    /// EW green except inside the NS windows.
    StaticImbalanced {
        #[serde(default = "default_imbalanced_windows")]
        windows: Vec<TickWindow>,
    },
    /// One-step lookahead on the episode's own reward.
    RewardGreedy,
    /// Decisions come from an injected decision port.
    External,
}

impl Default for ControllerKind {
    fn default() -> Self {
        ControllerKind::StaticImbalanced {
            windows: default_imbalanced_windows(),
        }
    }
}

impl ControllerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControllerKind::FixedCycle { .. } => "fixed_cycle",
            ControllerKind::StaticImbalanced { .. } => "static_imbalanced",
            ControllerKind::RewardGreedy => "reward_greedy",
            ControllerKind::External => "external",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ControllerKind::FixedCycle { period } if *period == 0 => {
                Err(ConfigError::NotPositive {
                    field: "controller.period",
                })
            }
            ControllerKind::StaticImbalanced { windows } => {
                for w in windows {
                    if w.start >= w.end {
                        return Err(ConfigError::EmptyWindow {
                            start: w.start,
                            end: w.end,
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level params
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionParams {
    pub arrival: ScenarioSource,
    pub service: ServiceParams,
    pub reward: RewardWeights,
    pub safety: SafetyParams,
    pub controller: ControllerKind,
    pub horizon: u64,
    pub initial_phase: Axis,
}

impl Default for IntersectionParams {
    /// Fixed 0.4 / 0.1 clear-weather demand under the static imbalanced
    /// controller with no fairness penalty.
    fn default() -> Self {
        Self {
            arrival: ScenarioSource::Fixed(TrafficScenario::default()),
            service: ServiceParams::default(),
            reward: RewardWeights::default(),
            safety: SafetyParams::default(),
            controller: ControllerKind::default(),
            horizon: DEFAULT_HORIZON,
            initial_phase: Axis::EastWest,
        }
    }
}

impl IntersectionParams {
    /// Reward-hacking baseline: scenarios sampled per reset, throughput-only
    /// reward, static imbalanced controller.
    pub fn baseline() -> Self {
        Self {
            arrival: ScenarioSource::default(),
            ..Self::default()
        }
    }

    /// Fairness-penalised configuration with a stricter safety model and a
    /// reward-greedy controller. Hard-case pool scenarios are picked with
    /// probability 0.4 once a pool is installed.
    pub fn mitigated() -> Self {
        let mut arrival = ScenarioSource::default();
        arrival.set_pool(Vec::new(), 0.4);
        Self {
            arrival,
            reward: RewardWeights {
                fairness: 0.08,
                safety: 3.0,
                ..RewardWeights::default()
            },
            safety: SafetyParams {
                ttc_threshold: 1.4,
                ..SafetyParams::default()
            },
            controller: ControllerKind::RewardGreedy,
            ..Self::default()
        }
    }

    /// Baseline demand under a fixed-cycle controller.
    pub fn fixed_cycle(period: u64) -> Self {
        Self {
            controller: ControllerKind::FixedCycle { period },
            ..Self::baseline()
        }
    }

    pub fn with_scenario(mut self, scenario: TrafficScenario) -> Self {
        self.arrival = ScenarioSource::Fixed(scenario);
        self
    }

    pub fn with_controller(mut self, controller: ControllerKind) -> Self {
        self.controller = controller;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arrival.validate()?;
        if self.service.max_queue == 0 {
            return Err(ConfigError::NotPositive {
                field: "service.max_queue",
            });
        }
        if self.service.max_flow == 0 {
            return Err(ConfigError::NotPositive {
                field: "service.max_flow",
            });
        }
        self.reward.validate()?;
        self.safety.validate()?;
        self.controller.validate()?;
        if self.horizon == 0 {
            return Err(ConfigError::NotPositive { field: "horizon" });
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}
