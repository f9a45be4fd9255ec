//! Synthetic participant responses.
//!
//! Reaction times follow an exponentially modified Gaussian: a normal
//! component plus an exponential tail, which gives the right skew seen in
//! human data. Successive responses are spaced by independent draws, so
//! their timestamps strictly increase.

use rand::Rng;
use serde::{Deserialize, Serialize};
use trialrig_core::{Choice, ChoiceSet, ConfigError};

use crate::config::Multiplicity;

const MAX_REDRAWS: usize = 1000;
/// Upper bound on every distribution parameter: one hour.
pub const MAX_LATENCY_MS: f64 = 3_600_000.0;

/// Ex-Gaussian latency parameters, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExGaussian {
    pub mean_ms: f64,
    pub sd_ms: f64,
    /// Mean of the exponential tail (the inverse of its rate).
    pub tau_ms: f64,
}

impl Default for ExGaussian {
    fn default() -> Self {
        Self {
            mean_ms: 500.0,
            sd_ms: 50.0,
            tau_ms: 150.0,
        }
    }
}

impl ExGaussian {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let params = [self.mean_ms, self.sd_ms, self.tau_ms];
        let bounded = params.iter().all(|p| p.is_finite() && *p <= MAX_LATENCY_MS);
        if !bounded || self.mean_ms <= 0.0 || self.sd_ms < 0.0 || self.tau_ms < 0.0 {
            return Err(ConfigError::InvalidLatency(format!(
                "mean {} ms, sd {} ms, tau {} ms",
                self.mean_ms, self.sd_ms, self.tau_ms
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let normal = self.mean_ms + self.sd_ms * standard_normal(rng);
        let tail = if self.tau_ms > 0.0 {
            -self.tau_ms * (1.0 - rng.random::<f64>()).ln()
        } else {
            0.0
        };
        normal + tail
    }

    /// Whole milliseconds, redrawn until at least 1.
    fn sample_positive_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        for _ in 0..MAX_REDRAWS {
            let ms = self.sample(rng).round();
            if ms >= 1.0 {
                return ms as u64;
            }
        }
        1
    }
}

/// Box-Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Inclusive range of responses per simulated trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCount {
    pub min: u32,
    pub max: u32,
}

impl Default for ResponseCount {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

/// Everything the sampler needs to fake one participant's trial
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    pub response_count: ResponseCount,
    pub multiplicity: Multiplicity,
    pub latency: ExGaussian,
    pub choices: ChoiceSet,
}

impl SimulationProfile {
    pub fn new(choices: ChoiceSet, multiplicity: Multiplicity) -> Self {
        Self {
            response_count: ResponseCount::default(),
            multiplicity,
            latency: ExGaussian::default(),
            choices,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ResponseCount { min, max } = self.response_count;
        if min == 0 || min > max {
            return Err(ConfigError::InvalidResponseRange { min, max });
        }
        self.latency.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledResponse {
    /// Cumulative time since the acceptance window opened.
    pub latency_ms: u64,
    pub choice: Choice,
}

pub fn sample<R: Rng + ?Sized>(
    profile: &SimulationProfile,
    rng: &mut R,
) -> Result<Vec<SampledResponse>, ConfigError> {
    profile.validate()?;
    let candidates = profile.choices.candidates();
    if candidates.is_empty() {
        return Err(ConfigError::EmptyChoiceSet);
    }

    let count = match profile.multiplicity {
        Multiplicity::FirstOnly => 1,
        Multiplicity::All => {
            rng.random_range(profile.response_count.min..=profile.response_count.max)
        }
    };

    let mut elapsed = 0;
    let responses = (0..count)
        .map(|_| {
            elapsed = profile.latency.sample_positive_ms(rng).saturating_add(elapsed);
            let choice = candidates[rng.random_range(0..candidates.len())].clone();
            SampledResponse {
                latency_ms: elapsed,
                choice,
            }
        })
        .collect();
    Ok(responses)
}
