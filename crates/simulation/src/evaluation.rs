//! Batch evaluation: run a configuration over consecutive seeds and
//! summarise reward, fairness, safety and the scenarios that went badly.

use std::fmt;

use bevy::log::info;
use serde::Serialize;

use crate::config::HARD_CASE_GAP;
use crate::episode::{Episode, StepError};
use crate::intersection_params::{ConfigError, IntersectionParams};
use crate::phase_controller::{build_controller, PhaseController};
use crate::scenario::TrafficScenario;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    Config(ConfigError),
    Step { seed: u64, error: StepError },
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::Config(err) => write!(f, "invalid configuration: {err}"),
            EvaluationError::Step { seed, error } => write!(f, "seed {seed}: {error}"),
        }
    }
}

impl std::error::Error for EvaluationError {}

impl From<ConfigError> for EvaluationError {
    fn from(err: ConfigError) -> Self {
        EvaluationError::Config(err)
    }
}

/// Outcome of one evaluated episode. Gap and waits are means of the
/// per-tick values over the episode, not their final values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub seed: u64,
    pub reward: f64,
    pub fairness_gap: f64,
    pub wait_ns: f64,
    pub wait_ew: f64,
    pub green_pct_ew: f64,
    pub safety_violations: u64,
    pub decision_failures: u64,
    /// The episode's scenario, if any tick had a safety violation or a
    /// fairness gap above the hard-case threshold.
    pub hard_case: Option<TrafficScenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub controller: String,
    pub episodes: usize,
    pub reward_mean: f64,
    /// Population standard deviation.
    pub reward_std: f64,
    pub fairness_gap_mean: f64,
    pub avg_wait_ns: f64,
    pub avg_wait_ew: f64,
    pub green_pct_ew_mean: f64,
    pub safety_violations: u64,
    pub decision_failures: u64,
    pub hard_cases: Vec<TrafficScenario>,
    pub reports: Vec<EpisodeReport>,
}

/// Evaluate the controller named in `params` on seeds
/// `base_seed..base_seed + episodes`.
pub fn evaluate(
    params: &IntersectionParams,
    episodes: usize,
    base_seed: u64,
) -> Result<EvaluationSummary, EvaluationError> {
    params.validate()?;
    evaluate_with(params, episodes, base_seed, || build_controller(params))
}

/// Like [`evaluate`], with a fresh controller from `make_controller` per
/// episode.
pub fn evaluate_with<F>(
    params: &IntersectionParams,
    episodes: usize,
    base_seed: u64,
    mut make_controller: F,
) -> Result<EvaluationSummary, EvaluationError>
where
    F: FnMut() -> Result<Box<dyn PhaseController>, ConfigError>,
{
    let mut reports = Vec::with_capacity(episodes);
    let mut label = String::new();
    for i in 0..episodes {
        let seed = base_seed.wrapping_add(i as u64);
        let controller = make_controller()?;
        label = controller.label().to_string();
        let episode = Episode::with_controller(params.clone(), controller, seed)?;
        reports.push(run_episode(episode)?);
    }
    let summary = summarise(label, reports);
    info!(
        "Evaluated {} episodes of {}: reward {:.3} +/- {:.3}, gap {:.3}, {} hard cases",
        summary.episodes,
        summary.controller,
        summary.reward_mean,
        summary.reward_std,
        summary.fairness_gap_mean,
        summary.hard_cases.len()
    );
    Ok(summary)
}

fn run_episode(mut episode: Episode) -> Result<EpisodeReport, EvaluationError> {
    let seed = episode.seed();
    let mut hard = false;
    let mut gaps = Vec::with_capacity(episode.state().horizon as usize);
    let mut waits_ns = Vec::with_capacity(gaps.capacity());
    let mut waits_ew = Vec::with_capacity(gaps.capacity());
    while episode.is_running() {
        let result = episode
            .step()
            .map_err(|error| EvaluationError::Step { seed, error })?;
        let info = &result.info;
        if info.safety_violations() > 0 || info.fairness_gap > HARD_CASE_GAP {
            hard = true;
        }
        gaps.push(info.fairness_gap);
        waits_ns.push(info.avg_wait_ns);
        waits_ew.push(info.avg_wait_ew);
    }
    let s = episode.state();
    Ok(EpisodeReport {
        seed,
        reward: s.cumulative_reward,
        fairness_gap: mean(gaps.into_iter()),
        wait_ns: mean(waits_ns.into_iter()),
        wait_ew: mean(waits_ew.into_iter()),
        green_pct_ew: s.green_pct_ew,
        safety_violations: s.safety_violations,
        decision_failures: s.decision_failures,
        hard_case: hard.then_some(s.scenario),
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn summarise(controller: String, reports: Vec<EpisodeReport>) -> EvaluationSummary {
    let reward_mean = mean(reports.iter().map(|r| r.reward));
    let reward_std = mean(reports.iter().map(|r| (r.reward - reward_mean).powi(2))).sqrt();
    EvaluationSummary {
        controller,
        episodes: reports.len(),
        reward_mean,
        reward_std,
        fairness_gap_mean: mean(reports.iter().map(|r| r.fairness_gap)),
        avg_wait_ns: mean(reports.iter().map(|r| r.wait_ns)),
        avg_wait_ew: mean(reports.iter().map(|r| r.wait_ew)),
        green_pct_ew_mean: mean(reports.iter().map(|r| r.green_pct_ew)),
        safety_violations: reports.iter().map(|r| r.safety_violations).sum(),
        decision_failures: reports.iter().map(|r| r.decision_failures).sum(),
        hard_cases: reports.iter().filter_map(|r| r.hard_case).collect(),
        reports,
    }
}
