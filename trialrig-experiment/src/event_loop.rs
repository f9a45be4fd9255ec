//! Deterministic host for a single trial.
//!
//! Time only advances when [`VirtualLoop::tick`] is called. Each tick
//! delivers due timers first, then stimulus signals, then scripted inputs
//! that the listener registry accepted.

use log::debug;
use rand::Rng;
use trialrig_core::{Choice, ConfigError, ResponseRecord};
use trialrig_timing::{HighPrecisionTimer, VirtualTimers};

use crate::config::TrialConfig;
use crate::error::SimulationError;
use crate::input::ListenerSet;
use crate::playback::SimulatedStimulus;
use crate::state::{Collaborators, TrialController, TrialEvent};

pub const DEFAULT_STEP_MS: u64 = 1;
pub const DEFAULT_HORIZON_MS: u64 = 10 * 60 * 1000;

pub type VirtualController =
    TrialController<SimulatedStimulus, ListenerSet, VirtualTimers, Vec<ResponseRecord>>;

#[derive(Debug, Clone, Copy)]
enum Anchor {
    At(u64),
    AfterWindow(u64),
}

#[derive(Debug, Clone)]
struct ScriptedInput {
    anchor: Anchor,
    choice: Choice,
}

impl ScriptedInput {
    fn due(&self, window_opened: Option<u64>) -> Option<u64> {
        match self.anchor {
            Anchor::At(at_ms) => Some(at_ms),
            Anchor::AfterWindow(latency) => window_opened.map(|opened| opened + latency),
        }
    }
}

pub struct VirtualLoop {
    controller: VirtualController,
    now_ms: u64,
    step_ms: u64,
    horizon_ms: u64,
    script: Vec<ScriptedInput>,
    pacer: Option<HighPrecisionTimer>,
}

impl VirtualLoop {
    pub fn new<R: Rng + ?Sized>(
        config: TrialConfig,
        stimulus: SimulatedStimulus,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let controller = TrialController::new(
            config,
            Collaborators {
                stimulus,
                input: ListenerSet::new(),
                timers: VirtualTimers::new(),
                sink: Vec::new(),
            },
            rng,
        )?;
        Ok(Self {
            controller,
            now_ms: 0,
            step_ms: DEFAULT_STEP_MS,
            horizon_ms: DEFAULT_HORIZON_MS,
            script: Vec::new(),
            pacer: None,
        })
    }

    pub fn with_step(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms.max(1);
        self
    }

    pub fn with_horizon(mut self, horizon_ms: u64) -> Self {
        self.horizon_ms = horizon_ms;
        self
    }

    /// Keeps virtual time from running ahead of the wall clock.
    pub fn paced(mut self) -> Self {
        self.pacer = Some(HighPrecisionTimer::new());
        self
    }

    /// Raw input at an absolute virtual time. Dropped if no listener takes it.
    pub fn press_at(&mut self, at_ms: u64, choice: Choice) {
        self.script.push(ScriptedInput {
            anchor: Anchor::At(at_ms),
            choice,
        });
    }

    /// Raw input `latency_ms` after the acceptance window opens.
    pub fn respond_after_window(&mut self, latency_ms: u64, choice: Choice) {
        self.script.push(ScriptedInput {
            anchor: Anchor::AfterWindow(latency_ms),
            choice,
        });
    }

    pub fn tick(&mut self) {
        let now = self.now_ms;
        self.controller.timers_mut().set_now(now);

        while let Some(handle) = self.controller.timers_mut().pop_due() {
            self.controller.handle(TrialEvent::TimerFired(handle));
        }

        for signal in self.controller.stimulus_mut().poll(now) {
            self.controller.handle(signal.into());
        }

        self.dispatch_inputs(now);

        if let Some(pacer) = &self.pacer {
            pacer.sleep_until_ms(now);
        }
        self.now_ms += self.step_ms;
    }

    fn dispatch_inputs(&mut self, now: u64) {
        let window_opened = self.controller.window_opened_at();
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.script)
            .into_iter()
            .partition(|input| input.due(window_opened).is_some_and(|at| at <= now));
        self.script = waiting;

        for input in due {
            if self.controller.input_mut().dispatch(&input.choice) {
                self.controller.handle(TrialEvent::Response(input.choice));
            } else {
                debug!("input {:?} at {} ms rejected", input.choice, now);
            }
        }
    }

    /// Ticks until the trial is sealed.
    pub fn run(&mut self) -> Result<ResponseRecord, SimulationError> {
        while !self.controller.is_terminated() {
            if self.now_ms > self.horizon_ms {
                return Err(SimulationError::Stalled {
                    horizon_ms: self.horizon_ms,
                });
            }
            self.tick();
        }
        self.controller
            .sink()
            .last()
            .cloned()
            .ok_or(SimulationError::MissingRecord)
    }

    /// Ticks up to and including `until_ms`, or until the trial is sealed.
    pub fn run_until(&mut self, until_ms: u64) {
        while self.now_ms <= until_ms && !self.controller.is_terminated() {
            self.tick();
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn controller(&self) -> &VirtualController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut VirtualController {
        &mut self.controller
    }
}
