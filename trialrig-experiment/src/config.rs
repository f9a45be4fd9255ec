use serde::{Deserialize, Serialize};
use trialrig_core::{ChoiceSet, ConfigError, Position, TrialKind};

/// Whether a trial keeps every response or only the first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    FirstOnly,
    All,
}

impl Multiplicity {
    pub fn allows_many(&self) -> bool {
        matches!(self, Multiplicity::All)
    }
}

/// When responses start being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceWindow {
    /// From presentation onset.
    Immediate,
    /// Only after the stimulus finished playing.
    AfterStimulus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// The same clip in one or more file formats.
    pub sources: Vec<String>,
    /// Seconds into the clip where playback begins.
    #[serde(default)]
    pub start: Option<f64>,
    /// Seconds into the clip where playback is cut.
    #[serde(default)]
    pub stop: Option<f64>,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

impl VideoConfig {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            start: None,
            stop: None,
            rate: default_rate(),
            autoplay: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::MissingSources);
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(ConfigError::InvalidPlayback(format!(
                "rate must be positive, got {}",
                self.rate
            )));
        }
        for (name, offset) in [("start", self.start), ("stop", self.stop)] {
            if let Some(t) = offset {
                if !(t.is_finite() && t >= 0.0) {
                    return Err(ConfigError::InvalidPlayback(format!(
                        "{name} must be a non-negative time, got {t}"
                    )));
                }
            }
        }
        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            if stop <= start {
                return Err(ConfigError::InvalidPlayback(format!(
                    "stop ({stop}) must come after start ({start})"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArrayConfig {
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub target_present: bool,
    #[serde(default)]
    pub target_index: usize,
    /// Item edge length, in the same unit as the area dimensions.
    #[serde(default = "default_image_size")]
    pub image_size: f64,
    #[serde(default = "default_area_width")]
    pub search_area_width: f64,
    #[serde(default = "default_area_height")]
    pub search_area_height: f64,
    /// Explicit item centers; bypasses random placement when set.
    #[serde(default)]
    pub image_positions: Option<Vec<Position>>,
}

impl SearchArrayConfig {
    pub fn new<I, S>(images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            images: images.into_iter().map(Into::into).collect(),
            target_present: true,
            target_index: 0,
            image_size: default_image_size(),
            search_area_width: default_area_width(),
            search_area_height: default_area_height(),
            image_positions: None,
        }
    }

    pub fn target_absent(mut self) -> Self {
        self.target_present = false;
        self
    }

    pub fn with_target(mut self, index: usize) -> Self {
        self.target_present = true;
        self.target_index = index;
        self
    }

    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.image_positions = Some(positions);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let len = self.images.len();
        if self.target_present && self.target_index >= len {
            return Err(ConfigError::TargetOutOfBounds {
                index: self.target_index,
                len,
            });
        }
        if let Some(positions) = &self.image_positions {
            if positions.len() != len {
                return Err(ConfigError::PlacementMismatch {
                    positions: positions.len(),
                    items: len,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StimulusConfig {
    Video(VideoConfig),
    SearchArray(SearchArrayConfig),
}

/// Trial parameters, resolved before the trial starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub stimulus: StimulusConfig,
    #[serde(default)]
    pub choices: ChoiceSet,
    #[serde(default = "default_true")]
    pub response_allowed_while_playing: bool,
    #[serde(default = "default_true")]
    pub multiple_responses_allowed: bool,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
    #[serde(default)]
    pub trial_ends_after_stimulus: bool,
    #[serde(default, rename = "trial_duration")]
    pub trial_duration_ms: Option<u64>,
}

impl TrialConfig {
    pub fn video<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_stimulus(StimulusConfig::Video(VideoConfig::new(sources)))
    }

    pub fn visual_search(search: SearchArrayConfig) -> Self {
        Self {
            multiple_responses_allowed: false,
            ..Self::with_stimulus(StimulusConfig::SearchArray(search))
        }
    }

    fn with_stimulus(stimulus: StimulusConfig) -> Self {
        Self {
            stimulus,
            choices: ChoiceSet::default(),
            response_allowed_while_playing: true,
            multiple_responses_allowed: true,
            response_ends_trial: true,
            trial_ends_after_stimulus: false,
            trial_duration_ms: None,
        }
    }

    pub fn kind(&self) -> TrialKind {
        match self.stimulus {
            StimulusConfig::Video(_) => TrialKind::Video,
            StimulusConfig::SearchArray(_) => TrialKind::VisualSearch,
        }
    }

    pub fn video_config(&self) -> Option<&VideoConfig> {
        match &self.stimulus {
            StimulusConfig::Video(video) => Some(video),
            StimulusConfig::SearchArray(_) => None,
        }
    }

    pub fn search_config(&self) -> Option<&SearchArrayConfig> {
        match &self.stimulus {
            StimulusConfig::SearchArray(search) => Some(search),
            StimulusConfig::Video(_) => None,
        }
    }

    /// Search arrays listen for clicks on their items and the absent button,
    /// whatever `choices` says.
    pub fn choice_set(&self) -> ChoiceSet {
        match &self.stimulus {
            StimulusConfig::SearchArray(search) => ChoiceSet::Items {
                count: search.images.len(),
                absent: true,
            },
            StimulusConfig::Video(_) => self.choices.clone(),
        }
    }

    pub fn multiplicity(&self) -> Multiplicity {
        match self.stimulus {
            StimulusConfig::SearchArray(_) => Multiplicity::FirstOnly,
            StimulusConfig::Video(_) if self.multiple_responses_allowed => Multiplicity::All,
            StimulusConfig::Video(_) => Multiplicity::FirstOnly,
        }
    }

    pub fn acceptance_window(&self) -> AcceptanceWindow {
        match self.stimulus {
            StimulusConfig::Video(_) if !self.response_allowed_while_playing => {
                AcceptanceWindow::AfterStimulus
            }
            _ => AcceptanceWindow::Immediate,
        }
    }

    pub fn ends_on_response(&self) -> bool {
        match self.stimulus {
            StimulusConfig::SearchArray(_) => true,
            StimulusConfig::Video(_) => self.response_ends_trial,
        }
    }

    /// Files shown to the participant.
    pub fn stimulus_files(&self) -> Vec<String> {
        match &self.stimulus {
            StimulusConfig::Video(video) => video.sources.clone(),
            StimulusConfig::SearchArray(search) => search.images.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.stimulus {
            StimulusConfig::Video(video) => video.validate()?,
            StimulusConfig::SearchArray(search) => search.validate()?,
        }
        if matches!(&self.choices, ChoiceSet::Keys(keys) if keys.is_empty()) {
            return Err(ConfigError::EmptyChoiceSet);
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_rate() -> f64 {
    1.0
}

fn default_image_size() -> f64 {
    10.0
}

fn default_area_width() -> f64 {
    90.0
}

fn default_area_height() -> f64 {
    80.0
}
