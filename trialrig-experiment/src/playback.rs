use trialrig_core::{StimulusHandle, StimulusSignal};

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 250;

/// Every command a [`SimulatedStimulus`] received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StimulusCall {
    Play,
    Pause,
    SeekTo(f64),
    Visible(bool),
    Muted(bool),
    PlaybackRate(f64),
    Responded,
}

/// Headless stand-in for a media element.
///
/// Reports `Ready` on its first poll, completes seeks on the following poll,
/// and while playing advances its position by the elapsed virtual time,
/// raising periodic position updates and a final `Ended`.
#[derive(Debug, Clone)]
pub struct SimulatedStimulus {
    duration_ms: Option<f64>,
    rate: f64,
    position_ms: f64,
    playing: bool,
    visible: bool,
    muted: bool,
    ready_sent: bool,
    seek_pending: bool,
    ended: bool,
    last_poll_ms: Option<u64>,
    update_interval_ms: u64,
    since_update_ms: u64,
    calls: Vec<StimulusCall>,
}

impl SimulatedStimulus {
    pub fn video(duration_ms: u64) -> Self {
        Self::with_duration(Some(duration_ms as f64))
    }

    /// A static display such as an image array; it never ends.
    pub fn still() -> Self {
        Self::with_duration(None)
    }

    fn with_duration(duration_ms: Option<f64>) -> Self {
        Self {
            duration_ms,
            rate: 1.0,
            position_ms: 0.0,
            playing: false,
            visible: true,
            muted: false,
            ready_sent: false,
            seek_pending: false,
            ended: false,
            last_poll_ms: None,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            since_update_ms: 0,
            calls: Vec::new(),
        }
    }

    pub fn with_update_interval(mut self, interval_ms: u64) -> Self {
        self.update_interval_ms = interval_ms.max(1);
        self
    }

    pub fn calls(&self) -> &[StimulusCall] {
        &self.calls
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn poll(&mut self, now_ms: u64) -> Vec<StimulusSignal> {
        let dt = now_ms.saturating_sub(self.last_poll_ms.unwrap_or(now_ms));
        self.last_poll_ms = Some(now_ms);

        if !self.ready_sent {
            self.ready_sent = true;
            return vec![StimulusSignal::Ready];
        }

        let mut signals = Vec::new();
        if self.seek_pending {
            self.seek_pending = false;
            signals.push(StimulusSignal::SeekCompleted);
            return signals;
        }

        let Some(duration_ms) = self.duration_ms else {
            return signals;
        };
        if !self.playing || self.ended {
            return signals;
        }

        self.position_ms += dt as f64 * self.rate;
        self.since_update_ms += dt;
        if self.position_ms >= duration_ms {
            self.position_ms = duration_ms;
            self.playing = false;
            self.ended = true;
            signals.push(StimulusSignal::Ended);
        } else if self.since_update_ms >= self.update_interval_ms {
            self.since_update_ms = 0;
            signals.push(StimulusSignal::PositionUpdate(self.current_position()));
        }
        signals
    }
}

impl StimulusHandle for SimulatedStimulus {
    fn play(&mut self) {
        self.calls.push(StimulusCall::Play);
        if !self.ended {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.calls.push(StimulusCall::Pause);
        self.playing = false;
    }

    fn seek_to(&mut self, seconds: f64) {
        self.calls.push(StimulusCall::SeekTo(seconds));
        self.position_ms = seconds * 1000.0;
        self.seek_pending = true;
    }

    fn current_position(&self) -> f64 {
        self.position_ms / 1000.0
    }

    fn set_visible(&mut self, visible: bool) {
        self.calls.push(StimulusCall::Visible(visible));
        self.visible = visible;
    }

    fn set_muted(&mut self, muted: bool) {
        self.calls.push(StimulusCall::Muted(muted));
        self.muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.calls.push(StimulusCall::PlaybackRate(rate));
        self.rate = rate;
    }

    fn mark_responded(&mut self) {
        self.calls.push(StimulusCall::Responded);
    }
}
