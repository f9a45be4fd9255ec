use log::info;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trialrig_core::ResponseRecord;

use crate::config::TrialConfig;
use crate::error::SimulationError;
use crate::simulation::{SimulationOptions, export_with_overrides, simulate};

/// Trial plus the values merged over its exported record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrial {
    pub trial: TrialConfig,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl From<TrialConfig> for SessionTrial {
    fn from(trial: TrialConfig) -> Self {
        Self {
            trial,
            data: Map::new(),
        }
    }
}

/// An ordered list of trials run with one random source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub simulation: SimulationOptions,
    pub trials: Vec<SessionTrial>,
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub records: Vec<ResponseRecord>,
    pub exported: Vec<Value>,
    pub summary: Summary,
}

pub fn run_session(session: &SessionConfig) -> Result<SessionOutcome, SimulationError> {
    match session.seed {
        Some(seed) => run_with(session, &mut Pcg64::seed_from_u64(seed)),
        None => run_with(session, &mut rand::rng()),
    }
}

pub fn run_with<R: Rng + ?Sized>(
    session: &SessionConfig,
    rng: &mut R,
) -> Result<SessionOutcome, SimulationError> {
    let total = session.trials.len();
    let mut records = Vec::with_capacity(total);
    let mut exported = Vec::with_capacity(total);

    for (index, entry) in session.trials.iter().enumerate() {
        info!("Trial {}/{}", index + 1, total);
        let record = simulate(entry.trial.clone(), &session.simulation, rng)?;
        exported.push(export_with_overrides(&record, &entry.data)?);
        records.push(record);
    }

    let summary = Summary::from_records(&records);
    Ok(SessionOutcome {
        records,
        exported,
        summary,
    })
}

/// Response rate, accuracy and first-response reaction times
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub trials: usize,
    pub responded: usize,
    /// Percent of trials with at least one response.
    pub response_rate: f64,
    /// Percent correct over scored trials.
    pub accuracy: Option<f64>,
    pub mean_rt_ms: Option<f64>,
    pub min_rt_ms: Option<u64>,
    pub max_rt_ms: Option<u64>,
}

impl Summary {
    pub fn from_records(records: &[ResponseRecord]) -> Self {
        let times: Vec<u64> = records
            .iter()
            .filter_map(|r| r.first_response().map(|e| e.rt_ms))
            .collect();
        let scored: Vec<bool> = records.iter().filter_map(|r| r.correct).collect();

        let response_rate = if records.is_empty() {
            0.0
        } else {
            times.len() as f64 / records.len() as f64 * 100.0
        };
        let accuracy = (!scored.is_empty()).then(|| {
            scored.iter().filter(|c| **c).count() as f64 / scored.len() as f64 * 100.0
        });
        let mean_rt_ms = (!times.is_empty())
            .then(|| times.iter().sum::<u64>() as f64 / times.len() as f64);

        Self {
            trials: records.len(),
            responded: times.len(),
            response_rate,
            accuracy,
            mean_rt_ms,
            min_rt_ms: times.iter().copied().min(),
            max_rt_ms: times.iter().copied().max(),
        }
    }

    pub fn log(&self) {
        info!("Experiment Results:");
        info!(
            "Trials: {}, Response rate: {:.1}%",
            self.trials, self.response_rate
        );
        if let Some(accuracy) = self.accuracy {
            info!("Accuracy: {:.1}%", accuracy);
        }
        if let (Some(mean), Some(min), Some(max)) = (self.mean_rt_ms, self.min_rt_ms, self.max_rt_ms)
        {
            info!(
                "Reaction times: mean {:.3} ms, min {} ms, max {} ms",
                mean, min, max
            );
        }
    }
}
