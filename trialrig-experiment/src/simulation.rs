use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trialrig_core::{ResponseEvent, ResponseRecord, TerminationReason, TrialKind};

use crate::config::{AcceptanceWindow, Multiplicity, TrialConfig, VideoConfig};
use crate::error::SimulationError;
use crate::event_loop::{DEFAULT_HORIZON_MS, VirtualLoop};
use crate::playback::SimulatedStimulus;
use crate::sampler::{self, ExGaussian, ResponseCount, SimulationProfile};
use crate::trial::TrialPlan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMode {
    /// Sample responses and seal a record without presenting anything.
    #[default]
    DataOnly,
    /// Run the real controller against a simulated stimulus.
    Visual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub mode: SimulationMode,
    pub response_count: ResponseCount,
    pub latency: ExGaussian,
    /// Length of the simulated clip in visual mode.
    pub video_duration_ms: u64,
    pub horizon_ms: u64,
    /// Pace visual runs against the wall clock.
    pub realtime: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            mode: SimulationMode::DataOnly,
            response_count: ResponseCount::default(),
            latency: ExGaussian::default(),
            video_duration_ms: 5000,
            horizon_ms: DEFAULT_HORIZON_MS,
            realtime: false,
        }
    }
}

impl SimulationOptions {
    pub fn visual() -> Self {
        Self {
            mode: SimulationMode::Visual,
            ..Self::default()
        }
    }

    /// A trial that ends on its first response can never record a second.
    fn profile(&self, config: &TrialConfig) -> SimulationProfile {
        let multiplicity = if config.ends_on_response() {
            Multiplicity::FirstOnly
        } else {
            config.multiplicity()
        };
        SimulationProfile {
            response_count: self.response_count,
            multiplicity,
            latency: self.latency,
            choices: config.choice_set(),
        }
    }
}

/// Runs one trial without a participant.
pub fn simulate<R: Rng + ?Sized>(
    config: TrialConfig,
    options: &SimulationOptions,
    rng: &mut R,
) -> Result<ResponseRecord, SimulationError> {
    match options.mode {
        SimulationMode::DataOnly => simulate_data_only(config, options, rng),
        SimulationMode::Visual => simulate_visual(config, options, rng),
    }
}

/// Samples responses and seals a record with the timing a visual run would show.
///
/// Responses wait for the acceptance window: in a gated video trial they start
/// when playback of `video_duration_ms` (or the stop offset) completes. Trial
/// duration and stimulus completion cut off any later responses.
pub fn simulate_data_only<R: Rng + ?Sized>(
    config: TrialConfig,
    options: &SimulationOptions,
    rng: &mut R,
) -> Result<ResponseRecord, SimulationError> {
    let profile = options.profile(&config);
    let plan = TrialPlan::resolve(config, rng)?;
    let responses = sampler::sample(&profile, rng)?;

    let video = plan.config.video_config();
    let completion = video.map(|video| Completion::of(video, options.video_duration_ms));
    let window_ms = match (plan.config.acceptance_window(), &completion) {
        (AcceptanceWindow::AfterStimulus, Some(done)) => done.at_ms,
        _ => 0,
    };

    // Timers fire before stimulus signals, so a timeout wins a tie.
    let deadline = [
        plan.config
            .trial_duration_ms
            .map(|ms| (ms, TerminationReason::Timeout)),
        completion
            .as_ref()
            .filter(|_| plan.config.trial_ends_after_stimulus)
            .map(|done| (done.at_ms, done.reason)),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|(ms, _)| *ms);

    let events: Vec<ResponseEvent> = responses
        .into_iter()
        .map(|r| (window_ms.saturating_add(r.latency_ms), r.choice))
        .filter(|(rt, _)| deadline.is_none_or(|(ms, _)| *rt < ms))
        .map(|(rt, choice)| {
            let event = ResponseEvent::new(rt, choice);
            match (video, &completion) {
                (Some(video), Some(done)) => event.at_stimulus_time(
                    (video.start.unwrap_or(0.0) + rt as f64 / 1000.0 * video.rate)
                        .min(done.position),
                ),
                _ => event,
            }
        })
        .collect();

    let first_only = profile.multiplicity == Multiplicity::FirstOnly;
    let (ended_at_ms, ended_by) = match (events.last(), deadline) {
        (Some(last), _) if first_only => (last.rt_ms, TerminationReason::Response),
        (_, Some(deadline)) => deadline,
        (Some(last), None) => (last.rt_ms, TerminationReason::Response),
        (None, None) => (0, TerminationReason::Response),
    };
    info!(
        "simulated {:?} trial with {} response(s)",
        plan.config.kind(),
        events.len()
    );
    Ok(plan.seal(events, ended_at_ms, ended_by))
}

/// When and where simulated playback stops, relative to onset
#[derive(Debug, Clone, Copy, PartialEq)]
struct Completion {
    at_ms: u64,
    /// Stimulus position in seconds once stopped.
    position: f64,
    reason: TerminationReason,
}

impl Completion {
    fn of(video: &VideoConfig, duration_ms: u64) -> Self {
        let clip_end = duration_ms as f64 / 1000.0;
        let (position, reason) = match video.stop {
            Some(stop) if stop < clip_end => (stop, TerminationReason::StopOffset),
            _ => (clip_end, TerminationReason::StimulusEnded),
        };
        let played = (position - video.start.unwrap_or(0.0)).max(0.0);
        Self {
            at_ms: (played / video.rate * 1000.0).round() as u64,
            position,
            reason,
        }
    }
}

pub fn simulate_visual<R: Rng + ?Sized>(
    config: TrialConfig,
    options: &SimulationOptions,
    rng: &mut R,
) -> Result<ResponseRecord, SimulationError> {
    let profile = options.profile(&config);
    let stimulus = match config.kind() {
        TrialKind::Video => SimulatedStimulus::video(options.video_duration_ms),
        TrialKind::VisualSearch => SimulatedStimulus::still(),
    };

    let mut event_loop = VirtualLoop::new(config, stimulus, rng)?.with_horizon(options.horizon_ms);
    if options.realtime {
        event_loop = event_loop.paced();
    }
    for response in sampler::sample(&profile, rng)? {
        event_loop.respond_after_window(response.latency_ms, response.choice);
    }
    event_loop.run()
}

/// Exports a record with `overrides` shallow-merged over its fields.
pub fn export_with_overrides(
    record: &ResponseRecord,
    overrides: &Map<String, Value>,
) -> Result<Value, SimulationError> {
    let mut value = serde_json::to_value(record.export())?;
    if let Value::Object(fields) = &mut value {
        for (key, override_value) in overrides {
            fields.insert(key.clone(), override_value.clone());
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchArrayConfig, StimulusConfig};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use serde_json::json;

    #[test]
    fn modes_parse_from_kebab_case() {
        let options: SimulationOptions =
            serde_json::from_value(json!({"mode": "data-only"})).unwrap();
        assert_eq!(options.mode, SimulationMode::DataOnly);
        assert_eq!(options.video_duration_ms, 5000);

        let options: SimulationOptions = serde_json::from_value(json!({"mode": "visual"})).unwrap();
        assert_eq!(options.mode, SimulationMode::Visual);
    }

    #[test]
    fn data_only_video_time_follows_offset_and_rate() {
        let mut video = VideoConfig::new(["clip.mp4"]);
        video.start = Some(2.0);
        video.rate = 2.0;
        let config = TrialConfig {
            stimulus: StimulusConfig::Video(video),
            response_ends_trial: false,
            ..TrialConfig::video(["clip.mp4"])
        };
        let options = SimulationOptions {
            video_duration_ms: 600_000,
            ..SimulationOptions::default()
        };
        let record = simulate_data_only(config, &options, &mut Pcg64::seed_from_u64(21)).unwrap();

        assert!(!record.events.is_empty());
        for event in &record.events {
            let expected = 2.0 + event.rt_ms as f64 / 1000.0 * 2.0;
            assert!((event.stimulus_time.unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn data_only_duration_drops_late_responses() {
        let config = TrialConfig {
            trial_duration_ms: Some(1),
            ..TrialConfig::visual_search(SearchArrayConfig::new(["a.png", "b.png"]))
        };
        let options = SimulationOptions {
            latency: ExGaussian {
                mean_ms: 800.0,
                sd_ms: 0.0,
                tau_ms: 0.0,
            },
            ..SimulationOptions::default()
        };
        let record = simulate_data_only(config, &options, &mut Pcg64::seed_from_u64(2)).unwrap();
        assert!(record.events.is_empty());
        assert_eq!(record.ended_by, TerminationReason::Timeout);
        assert_eq!(record.ended_at_ms, 1);
        assert_eq!(record.correct, Some(false));
    }

    #[test]
    fn overrides_replace_exported_fields() {
        let record = simulate_data_only(
            TrialConfig::visual_search(SearchArrayConfig::new(["a.png", "b.png"])),
            &SimulationOptions::default(),
            &mut Pcg64::seed_from_u64(4),
        )
        .unwrap();

        let overrides = json!({"rt": 999, "participant": "p01"});
        let Value::Object(overrides) = overrides else {
            unreachable!()
        };
        let exported = export_with_overrides(&record, &overrides).unwrap();
        assert_eq!(exported["rt"], json!(999));
        assert_eq!(exported["participant"], json!("p01"));
        assert_eq!(exported["images"], json!(["a.png", "b.png"]));
    }

    #[test]
    fn completion_stops_at_offset_or_clip_end() {
        let mut video = VideoConfig::new(["clip.mp4"]);
        video.start = Some(1.0);
        video.stop = Some(3.0);
        video.rate = 2.0;
        let done = Completion::of(&video, 5000);
        assert_eq!(done.at_ms, 1000);
        assert_eq!(done.position, 3.0);
        assert_eq!(done.reason, TerminationReason::StopOffset);

        video.stop = Some(9.0);
        let done = Completion::of(&video, 5000);
        assert_eq!(done.at_ms, 2000);
        assert_eq!(done.reason, TerminationReason::StimulusEnded);
    }

    #[test]
    fn data_only_gated_responses_follow_playback() {
        let config = TrialConfig {
            response_allowed_while_playing: false,
            ..TrialConfig::video(["clip.mp4"])
        };
        let options = SimulationOptions {
            latency: ExGaussian {
                mean_ms: 548.0,
                sd_ms: 0.0,
                tau_ms: 0.0,
            },
            ..SimulationOptions::default()
        };
        let record = simulate_data_only(config, &options, &mut Pcg64::seed_from_u64(5)).unwrap();
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].rt_ms, 5548);
        assert_eq!(record.events[0].stimulus_time, Some(5.0));
    }
}
