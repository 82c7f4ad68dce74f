//! Traffic scenarios: the arrival rates and environmental conditions an
//! episode runs under. A scenario is fixed for the whole episode and chosen
//! at reset, either verbatim or sampled from ranges / a hard-case pool.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::intersection_params::ConfigError;
use crate::sim_rng::SimRng;

/// Parameters defining one traffic scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficScenario {
    /// Per-approach arrival probability on the north/south axis.
    pub ns_rate: f64,
    /// Per-approach arrival probability on the east/west axis.
    pub ew_rate: f64,
    /// 0 < visibility <= 1. Scales service flow and time-to-collision.
    pub visibility: f64,
    /// Per-axis, per-tick probability of a fast approaching car.
    pub fast_car_prob: f64,
}

impl TrafficScenario {
    /// Clear-weather scenario with the given arrival rates.
    pub fn with_rates(ew_rate: f64, ns_rate: f64) -> Self {
        Self {
            ns_rate,
            ew_rate,
            visibility: 1.0,
            fast_car_prob: 0.0,
        }
    }

    pub fn arrival_rate(&self, axis: Axis) -> f64 {
        match axis {
            Axis::EastWest => self.ew_rate,
            Axis::NorthSouth => self.ns_rate,
        }
    }

    pub fn ew_dominant(&self) -> bool {
        self.ew_rate > self.ns_rate
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("ns_rate", self.ns_rate)?;
        check_probability("ew_rate", self.ew_rate)?;
        check_probability("fast_car_prob", self.fast_car_prob)?;
        if !(self.visibility > 0.0 && self.visibility <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "visibility",
                value: self.visibility,
            });
        }
        Ok(())
    }
}

impl Default for TrafficScenario {
    fn default() -> Self {
        Self::with_rates(0.4, 0.1)
    }
}

/// Closed interval sampled uniformly at reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub min: f64,
    pub max: f64,
}

impl SampleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn sample(&self, rng: &mut SimRng) -> f64 {
        if self.min >= self.max {
            return self.min;
        }
        rng.0.gen_range(self.min..self.max)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Where an episode gets its scenario from at reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioSource {
    /// Always run the same scenario. No random draws at reset.
    Fixed(TrafficScenario),
    /// Sample each field uniformly; with probability `pool_prob` pick a
    /// scenario from `pool` instead.
    Sampled {
        ns_rate: SampleRange,
        ew_rate: SampleRange,
        visibility: SampleRange,
        fast_car_prob: SampleRange,
        #[serde(default)]
        pool: Vec<TrafficScenario>,
        #[serde(default)]
        pool_prob: f64,
    },
}

impl Default for ScenarioSource {
    fn default() -> Self {
        ScenarioSource::Sampled {
            ns_rate: SampleRange::new(0.05, 0.15),
            ew_rate: SampleRange::new(0.28, 0.5),
            visibility: SampleRange::new(0.4, 1.0),
            fast_car_prob: SampleRange::new(0.02, 0.18),
            pool: Vec::new(),
            pool_prob: 0.0,
        }
    }
}

impl ScenarioSource {
    pub fn sample(&self, rng: &mut SimRng) -> TrafficScenario {
        match self {
            ScenarioSource::Fixed(scenario) => *scenario,
            ScenarioSource::Sampled {
                ns_rate,
                ew_rate,
                visibility,
                fast_car_prob,
                pool,
                pool_prob,
            } => {
                if !pool.is_empty() && rng.chance(*pool_prob) {
                    let index = rng.0.gen_range(0..pool.len());
                    return pool[index];
                }
                TrafficScenario {
                    ns_rate: ns_rate.sample(rng),
                    ew_rate: ew_rate.sample(rng),
                    visibility: visibility.sample(rng),
                    fast_car_prob: fast_car_prob.sample(rng),
                }
            }
        }
    }

    /// Replace the hard-case pool and its selection probability.
    /// Has no effect on a fixed source.
    pub fn set_pool(&mut self, scenarios: Vec<TrafficScenario>, prob: f64) {
        if let ScenarioSource::Sampled {
            pool, pool_prob, ..
        } = self
        {
            *pool = scenarios;
            *pool_prob = prob;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ScenarioSource::Fixed(scenario) => scenario.validate(),
            ScenarioSource::Sampled {
                ns_rate,
                ew_rate,
                visibility,
                fast_car_prob,
                pool,
                pool_prob,
            } => {
                for (field, range) in [
                    ("ns_rate", ns_rate),
                    ("ew_rate", ew_rate),
                    ("fast_car_prob", fast_car_prob),
                ] {
                    range.validate(field)?;
                    check_probability(field, range.min)?;
                    check_probability(field, range.max)?;
                }
                visibility.validate("visibility")?;
                if !(visibility.min > 0.0 && visibility.max <= 1.0) {
                    return Err(ConfigError::InvalidRange {
                        field: "visibility",
                        min: visibility.min,
                        max: visibility.max,
                    });
                }
                check_probability("pool_prob", *pool_prob)?;
                for scenario in pool {
                    scenario.validate()?;
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}
