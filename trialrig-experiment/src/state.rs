use super::config::{AcceptanceWindow, Multiplicity, TrialConfig};
use super::trial::{TrialPlan, TrialTimestamps};
use log::{debug, info};
use rand::Rng;
use std::time::Duration;
use trialrig_core::{
    Choice, ConfigError, InputCapture, ListenerHandle, ResponseEvent, StimulusHandle,
    StimulusSignal, TerminationReason, TrialKind, TrialSink, TrialState,
};
use trialrig_timing::{TimerHandle, TimerService};

/// Inputs to the trial state machine
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    Stimulus(StimulusSignal),
    TimerFired(TimerHandle),
    /// An input already accepted by the host's input capture.
    Response(Choice),
}

impl From<StimulusSignal> for TrialEvent {
    fn from(signal: StimulusSignal) -> Self {
        TrialEvent::Stimulus(signal)
    }
}

/// Host services a trial runs against
#[derive(Debug)]
pub struct Collaborators<S, I, T, K> {
    pub stimulus: S,
    pub input: I,
    pub timers: T,
    pub sink: K,
}

/// One trial, from setup until its record is handed to the sink.
///
/// Create a fresh controller per trial and feed it every host event through
/// [`TrialController::handle`]. All termination triggers funnel into
/// [`TrialController::terminate`], which runs at most once.
pub struct TrialController<S, I, T, K>
where
    S: StimulusHandle,
    I: InputCapture,
    T: TimerService,
    K: TrialSink,
{
    plan: TrialPlan,
    stimulus: S,
    input: I,
    timers: T,
    sink: K,
    state: TrialState,
    events: Vec<ResponseEvent>,
    timestamps: TrialTimestamps,
    awaiting_seek: bool,
    timeout: Option<TimerHandle>,
    listener: Option<ListenerHandle>,
    terminated: bool,
    ended_by: Option<TerminationReason>,
}

impl<S, I, T, K> TrialController<S, I, T, K>
where
    S: StimulusHandle,
    I: InputCapture,
    T: TimerService,
    K: TrialSink,
{
    /// Setup: validates the configuration and resolves the item placement.
    pub fn new<R: Rng + ?Sized>(
        config: TrialConfig,
        collaborators: Collaborators<S, I, T, K>,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let plan = TrialPlan::resolve(config, rng)?;
        let Collaborators {
            mut stimulus,
            input,
            timers,
            sink,
        } = collaborators;

        if let Some(video) = plan.config.video_config() {
            stimulus.set_playback_rate(video.rate);
        }
        info!(
            "{:?} trial set up with {} stimulus file(s)",
            plan.config.kind(),
            plan.config.stimulus_files().len()
        );

        Ok(Self {
            plan,
            stimulus,
            input,
            timers,
            sink,
            state: TrialState::Setup,
            events: Vec::new(),
            timestamps: TrialTimestamps::default(),
            awaiting_seek: false,
            timeout: None,
            listener: None,
            terminated: false,
            ended_by: None,
        })
    }

    /// Applies one host event. Returns false when the event had no effect.
    pub fn handle(&mut self, event: TrialEvent) -> bool {
        if self.terminated {
            debug!("trial already finished, ignoring {:?}", event);
            return false;
        }

        match (self.state, event) {
            (TrialState::Setup, TrialEvent::Stimulus(StimulusSignal::Ready)) => {
                self.begin_presentation();
                true
            }
            (TrialState::Presenting, TrialEvent::Stimulus(StimulusSignal::SeekCompleted))
                if self.awaiting_seek =>
            {
                self.reveal();
                true
            }
            (
                TrialState::Presenting | TrialState::AwaitingResponse,
                TrialEvent::Stimulus(StimulusSignal::PositionUpdate(position)),
            ) => match self.stop_offset() {
                Some(stop) if position >= stop => {
                    self.finish_stimulus(TerminationReason::StopOffset)
                }
                _ => false,
            },
            (
                TrialState::Presenting | TrialState::AwaitingResponse,
                TrialEvent::Stimulus(StimulusSignal::Ended),
            ) => self.finish_stimulus(TerminationReason::StimulusEnded),
            (
                TrialState::Presenting | TrialState::AwaitingResponse,
                TrialEvent::TimerFired(handle),
            ) if self.timeout == Some(handle) => {
                self.timeout = None;
                self.terminate(TerminationReason::Timeout)
            }
            (TrialState::AwaitingResponse, TrialEvent::Response(choice)) => {
                self.accept(choice);
                true
            }
            (state, event) => {
                debug!("ignoring {:?} in state {:?}", event, state);
                false
            }
        }
    }

    /// Ends the trial and hands the sealed record to the sink.
    ///
    /// Only the first call has any effect; later calls return false.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.terminated {
            debug!("termination by {:?} ignored, trial already ended", reason);
            return false;
        }
        self.terminated = true;
        self.state = TrialState::Terminating;

        self.input.cancel_all();
        self.listener = None;
        if let Some(handle) = self.timeout.take() {
            self.timers.cancel(handle);
        }
        self.stimulus.pause();

        let now = self.timers.now_ms();
        self.timestamps.ended = Some(now);
        self.ended_by = Some(reason);
        let ended_at = self.timestamps.since_onset(now);
        let record = self
            .plan
            .seal(std::mem::take(&mut self.events), ended_at, reason);

        self.state = TrialState::Done;
        info!(
            "trial ended by {:?} after {} ms with {} response(s)",
            reason,
            ended_at,
            record.events.len()
        );
        self.sink.finalize(record);
        true
    }

    fn begin_presentation(&mut self) {
        self.timestamps.ready = Some(self.timers.now_ms());
        self.state = TrialState::Presenting;

        let Some(video) = self.plan.config.video_config() else {
            self.begin_onset();
            return;
        };
        let (start, autoplay) = (video.start, video.autoplay);
        match start {
            Some(start) => {
                // Keep the pre-offset frame out of sight until the seek lands.
                self.stimulus.set_visible(false);
                self.stimulus.set_muted(true);
                self.stimulus.pause();
                self.awaiting_seek = true;
                self.stimulus.seek_to(start);
            }
            None => {
                if autoplay {
                    self.stimulus.play();
                }
                self.begin_onset();
            }
        }
    }

    fn reveal(&mut self) {
        self.awaiting_seek = false;
        self.stimulus.set_visible(true);
        self.stimulus.set_muted(false);
        let autoplay = self
            .plan
            .config
            .video_config()
            .is_some_and(|video| video.autoplay);
        if autoplay {
            self.stimulus.play();
        } else {
            self.stimulus.pause();
        }
        self.begin_onset();
    }

    fn begin_onset(&mut self) {
        let now = self.timers.now_ms();
        self.timestamps.onset = Some(now);
        debug!("presentation onset at {} ms", now);

        if let Some(ms) = self.plan.config.trial_duration_ms {
            self.timeout = Some(self.timers.after(Duration::from_millis(ms)));
        }
        if self.plan.config.acceptance_window() == AcceptanceWindow::Immediate {
            self.open_window();
        }
    }

    fn open_window(&mut self) {
        if self.timestamps.window_opened.is_some() {
            return;
        }
        let now = self.timers.now_ms();
        self.timestamps.window_opened = Some(now);
        self.state = TrialState::AwaitingResponse;

        let choices = self.plan.config.choice_set();
        if choices.listens() {
            let persist = self.plan.config.multiplicity().allows_many();
            self.listener = Some(self.input.register_response_listener(&choices, persist));
        }
        debug!("acceptance window opened at {} ms", now);
    }

    /// Stimulus completion: either a natural end or the stop offset.
    fn finish_stimulus(&mut self, reason: TerminationReason) -> bool {
        if self.timestamps.stimulus_finished.is_some() {
            debug!("duplicate stimulus completion ({:?}) ignored", reason);
            return false;
        }
        self.timestamps.stimulus_finished = Some(self.timers.now_ms());
        if reason == TerminationReason::StopOffset {
            self.stimulus.pause();
        }

        if self.plan.config.trial_ends_after_stimulus {
            return self.terminate(reason);
        }
        if self.plan.config.acceptance_window() == AcceptanceWindow::AfterStimulus {
            self.open_window();
        }
        true
    }

    fn accept(&mut self, choice: Choice) {
        let now = self.timers.now_ms();
        let mut event = ResponseEvent::new(self.timestamps.since_onset(now), choice);
        if self.plan.config.kind() == TrialKind::Video {
            event = event.at_stimulus_time(self.stimulus.current_position());
        }
        debug!("response {:?} at {} ms", event.choice, event.rt_ms);
        self.stimulus.mark_responded();
        self.events.push(event);

        let ends = match self.plan.config.multiplicity() {
            Multiplicity::FirstOnly => true,
            Multiplicity::All => self.plan.config.ends_on_response(),
        };
        if ends {
            self.terminate(TerminationReason::Response);
        }
    }

    fn stop_offset(&self) -> Option<f64> {
        self.plan.config.video_config().and_then(|video| video.stop)
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    pub fn timestamps(&self) -> &TrialTimestamps {
        &self.timestamps
    }

    pub fn window_opened_at(&self) -> Option<u64> {
        self.timestamps.window_opened
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn ended_by(&self) -> Option<TerminationReason> {
        self.ended_by
    }

    pub fn responses(&self) -> &[ResponseEvent] {
        &self.events
    }

    pub fn listener(&self) -> Option<ListenerHandle> {
        self.listener
    }

    pub fn stimulus(&self) -> &S {
        &self.stimulus
    }

    pub fn stimulus_mut(&mut self) -> &mut S {
        &mut self.stimulus
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_parts(self) -> Collaborators<S, I, T, K> {
        Collaborators {
            stimulus: self.stimulus,
            input: self.input,
            timers: self.timers,
            sink: self.sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchArrayConfig, StimulusConfig, VideoConfig};
    use crate::input::ListenerSet;
    use crate::playback::{SimulatedStimulus, StimulusCall};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use trialrig_core::{ChoiceSet, ResponseRecord};
    use trialrig_timing::VirtualTimers;

    type TestController =
        TrialController<SimulatedStimulus, ListenerSet, VirtualTimers, Vec<ResponseRecord>>;

    fn controller(config: TrialConfig) -> TestController {
        TrialController::new(
            config,
            Collaborators {
                stimulus: SimulatedStimulus::video(5000),
                input: ListenerSet::new(),
                timers: VirtualTimers::new(),
                sink: Vec::new(),
            },
            &mut Pcg64::seed_from_u64(0),
        )
        .unwrap()
    }

    fn at(c: &mut TestController, now_ms: u64) {
        c.timers_mut().set_now(now_ms);
    }

    #[test]
    fn ready_opens_window_and_registers_listener() {
        let mut c = controller(TrialConfig {
            choices: ChoiceSet::keys(["f", "j"]),
            ..TrialConfig::video(["clip.mp4"])
        });
        assert_eq!(c.state(), TrialState::Setup);
        assert!(c.handle(StimulusSignal::Ready.into()));
        assert_eq!(c.state(), TrialState::AwaitingResponse);
        assert_eq!(c.input().registrations(), 1);
        assert!(c.listener().is_some());
        assert_eq!(c.stimulus().calls().last(), Some(&StimulusCall::Play));
    }

    #[test]
    fn no_keys_registers_no_listener() {
        let mut c = controller(TrialConfig {
            choices: ChoiceSet::NoKeys,
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        assert_eq!(c.input().registrations(), 0);
    }

    #[test]
    fn start_offset_hides_then_seeks_then_reveals() {
        let mut video = VideoConfig::new(["clip.mp4"]);
        video.start = Some(2.0);
        let mut c = controller(TrialConfig {
            stimulus: StimulusConfig::Video(video),
            ..TrialConfig::video(["clip.mp4"])
        });

        c.handle(StimulusSignal::Ready.into());
        assert_eq!(c.state(), TrialState::Presenting);
        assert!(!c.stimulus().is_visible());
        assert!(c.stimulus().is_muted());
        assert_eq!(c.window_opened_at(), None);

        at(&mut c, 40);
        c.handle(StimulusSignal::SeekCompleted.into());
        assert!(c.stimulus().is_visible());
        assert!(!c.stimulus().is_muted());
        assert_eq!(c.timestamps().onset, Some(40));

        let calls = c.stimulus().calls();
        let hide = calls.iter().position(|x| *x == StimulusCall::Visible(false));
        let seek = calls.iter().position(|x| *x == StimulusCall::SeekTo(2.0));
        let reveal = calls.iter().position(|x| *x == StimulusCall::Visible(true));
        assert!(hide < seek && seek < reveal, "calls: {calls:?}");
        assert_eq!(calls.last(), Some(&StimulusCall::Play));
    }

    #[test]
    fn seek_completion_outside_presentation_is_ignored() {
        let mut c = controller(TrialConfig::video(["clip.mp4"]));
        assert!(!c.handle(StimulusSignal::SeekCompleted.into()));
        c.handle(StimulusSignal::Ready.into());
        assert!(!c.handle(StimulusSignal::SeekCompleted.into()));
    }

    #[test]
    fn response_times_are_relative_to_onset() {
        let mut c = controller(TrialConfig {
            response_ends_trial: false,
            ..TrialConfig::video(["clip.mp4"])
        });
        at(&mut c, 100);
        c.handle(StimulusSignal::Ready.into());
        at(&mut c, 550);
        c.handle(TrialEvent::Response(Choice::key("f")));
        at(&mut c, 900);
        c.handle(TrialEvent::Response(Choice::key("j")));

        let rts: Vec<u64> = c.responses().iter().map(|e| e.rt_ms).collect();
        assert_eq!(rts, vec![450, 800]);
        assert_eq!(c.state(), TrialState::AwaitingResponse);
        assert!(c.sink().is_empty());
    }

    #[test]
    fn first_only_seals_on_first_response() {
        let mut c = controller(TrialConfig {
            multiple_responses_allowed: false,
            response_ends_trial: false,
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        at(&mut c, 300);
        assert!(c.handle(TrialEvent::Response(Choice::key("f"))));
        assert!(!c.handle(TrialEvent::Response(Choice::key("j"))));

        assert_eq!(c.state(), TrialState::Done);
        assert_eq!(c.sink().len(), 1);
        assert_eq!(c.sink()[0].events.len(), 1);
        assert_eq!(c.sink()[0].ended_by, TerminationReason::Response);
    }

    #[test]
    fn timeout_cancels_listeners_and_seals_empty_record() {
        let mut c = controller(TrialConfig {
            trial_duration_ms: Some(1000),
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        assert_eq!(c.timers().pending_count(), 1);

        at(&mut c, 1000);
        let handle = c.timers_mut().pop_due().unwrap();
        assert!(c.handle(TrialEvent::TimerFired(handle)));

        assert_eq!(c.input().active(), 0);
        assert_eq!(c.sink().len(), 1);
        assert!(c.sink()[0].events.is_empty());
        assert_eq!(c.sink()[0].ended_by, TerminationReason::Timeout);
        assert_eq!(c.sink()[0].ended_at_ms, 1000);
    }

    #[test]
    fn unknown_timer_is_ignored() {
        let mut c = controller(TrialConfig::video(["clip.mp4"]));
        c.handle(StimulusSignal::Ready.into());
        assert!(!c.handle(TrialEvent::TimerFired(TimerHandle(77))));
        assert!(!c.is_terminated());
    }

    #[test]
    fn response_releases_pending_timeout() {
        let mut c = controller(TrialConfig {
            trial_duration_ms: Some(2000),
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        at(&mut c, 500);
        c.handle(TrialEvent::Response(Choice::key("f")));
        assert_eq!(c.timers().pending_count(), 0);
        assert!(!c.stimulus().is_playing());
    }

    #[test]
    fn simultaneous_triggers_emit_one_record() {
        let mut video = VideoConfig::new(["clip.mp4"]);
        video.stop = Some(1.0);
        let mut c = controller(TrialConfig {
            stimulus: StimulusConfig::Video(video),
            trial_ends_after_stimulus: true,
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());

        at(&mut c, 1000);
        assert!(c.handle(StimulusSignal::PositionUpdate(1.0).into()));
        assert!(!c.handle(TrialEvent::Response(Choice::key("f"))));
        assert!(!c.handle(StimulusSignal::PositionUpdate(1.02).into()));
        assert!(!c.handle(StimulusSignal::Ended.into()));

        assert_eq!(c.sink().len(), 1);
        assert_eq!(c.sink()[0].ended_by, TerminationReason::StopOffset);
        assert!(c.sink()[0].events.is_empty());
    }

    #[test]
    fn terminating_twice_leaves_record_untouched() {
        let mut c = controller(TrialConfig::video(["clip.mp4"]));
        c.handle(StimulusSignal::Ready.into());
        at(&mut c, 420);
        c.handle(TrialEvent::Response(Choice::key("f")));
        let sealed = c.sink()[0].clone();

        assert!(!c.terminate(TerminationReason::Timeout));
        assert!(!c.terminate(TerminationReason::StimulusEnded));
        assert_eq!(c.sink().len(), 1);
        assert_eq!(c.sink()[0], sealed);
        assert_eq!(c.ended_by(), Some(TerminationReason::Response));
    }

    #[test]
    fn gated_window_opens_on_completion() {
        let mut c = controller(TrialConfig {
            response_allowed_while_playing: false,
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        assert_eq!(c.state(), TrialState::Presenting);
        assert!(!c.handle(TrialEvent::Response(Choice::key("f"))));
        assert_eq!(c.input().registrations(), 0);

        at(&mut c, 5000);
        assert!(c.handle(StimulusSignal::Ended.into()));
        assert_eq!(c.state(), TrialState::AwaitingResponse);
        assert_eq!(c.window_opened_at(), Some(5000));
        assert!(!c.handle(StimulusSignal::Ended.into()));
        assert_eq!(c.input().registrations(), 1);
    }

    #[test]
    fn stop_offset_pauses_without_ending_by_default() {
        let mut video = VideoConfig::new(["clip.mp4"]);
        video.stop = Some(1.5);
        let mut c = controller(TrialConfig {
            stimulus: StimulusConfig::Video(video),
            ..TrialConfig::video(["clip.mp4"])
        });
        c.handle(StimulusSignal::Ready.into());
        assert!(!c.handle(StimulusSignal::PositionUpdate(1.0).into()));
        assert!(c.handle(StimulusSignal::PositionUpdate(1.5).into()));
        assert!(!c.stimulus().is_playing());
        assert!(!c.is_terminated());
    }

    #[test]
    fn search_trial_scores_click_and_attaches_placement() {
        let mut c = controller(TrialConfig::visual_search(
            SearchArrayConfig::new(["target.png", "d1.png", "d2.png"]).with_target(0),
        ));
        c.handle(StimulusSignal::Ready.into());
        at(&mut c, 733);
        c.handle(TrialEvent::Response(Choice::Item(0)));

        assert!(c.state().is_finished());
        let placed = c.plan().placement.as_ref().map(|p| p.positions.clone());
        let Collaborators { sink, .. } = c.into_parts();
        let record = &sink[0];
        assert_eq!(record.correct, Some(true));
        assert_eq!(record.placement, placed);
        assert_eq!(record.placement.as_ref().map(Vec::len), Some(3));
        assert_eq!(record.events[0].rt_ms, 733);
        assert_eq!(record.events[0].stimulus_time, None);
    }

    #[test]
    fn setup_rejects_bad_configuration() {
        let result = TestController::new(
            TrialConfig::visual_search(SearchArrayConfig::new(["a.png"]).with_target(3)),
            Collaborators {
                stimulus: SimulatedStimulus::still(),
                input: ListenerSet::new(),
                timers: VirtualTimers::new(),
                sink: Vec::new(),
            },
            &mut Pcg64::seed_from_u64(0),
        );
        assert!(matches!(
            result,
            Err(ConfigError::TargetOutOfBounds { index: 3, len: 1 })
        ));
    }
}
