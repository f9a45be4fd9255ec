use log::warn;
use rand::Rng;
use trialrig_core::{Choice, ConfigError, ResponseEvent, ResponseRecord, TerminationReason};

use crate::config::{StimulusConfig, TrialConfig};
use crate::placement::{Placement, PlacementEngine};

/// Validated configuration plus everything resolved at setup
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    pub config: TrialConfig,
    pub placement: Option<Placement>,
}

impl TrialPlan {
    pub fn resolve<R: Rng + ?Sized>(config: TrialConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let placement = match &config.stimulus {
            StimulusConfig::SearchArray(search) => Some(match &search.image_positions {
                Some(positions) => Placement::explicit(positions.clone()),
                None => PlacementEngine::new(
                    search.image_size,
                    search.search_area_width,
                    search.search_area_height,
                )?
                .generate(search.images.len(), rng),
            }),
            StimulusConfig::Video(video) => {
                for source in &video.sources {
                    let path = source.split('?').next().unwrap_or(source);
                    if path.to_ascii_lowercase().ends_with(".mov") {
                        warn!("{source}: .mov files are not reliably supported");
                    }
                }
                None
            }
        };
        Ok(Self { config, placement })
    }

    /// Scores a spatial trial; other trials carry no correctness.
    pub fn evaluate(&self, events: &[ResponseEvent]) -> Option<bool> {
        let search = self.config.search_config()?;
        let chosen = events.first().map(|e| &e.choice);
        Some(match (search.target_present, chosen) {
            (true, Some(Choice::Item(index))) => *index == search.target_index,
            (false, Some(Choice::Absent)) => true,
            _ => false,
        })
    }

    pub fn seal(
        &self,
        events: Vec<ResponseEvent>,
        ended_at_ms: u64,
        ended_by: TerminationReason,
    ) -> ResponseRecord {
        ResponseRecord {
            kind: self.config.kind(),
            stimulus: self.config.stimulus_files(),
            correct: self.evaluate(&events),
            events,
            ended_at_ms,
            ended_by,
            placement: self.placement.as_ref().map(|p| p.positions.clone()),
        }
    }
}

/// Virtual-clock milestones of a running trial
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialTimestamps {
    pub ready: Option<u64>,
    pub onset: Option<u64>,
    pub window_opened: Option<u64>,
    pub stimulus_finished: Option<u64>,
    pub ended: Option<u64>,
}

impl TrialTimestamps {
    /// Milliseconds since presentation onset.
    pub fn since_onset(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.onset.unwrap_or(now_ms))
    }
}
