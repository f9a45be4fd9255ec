pub mod config;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod placement;
pub mod playback;
pub mod sampler;
pub mod session;
pub mod simulation;
pub mod state;
pub mod trial;

pub use config::{
    AcceptanceWindow, Multiplicity, SearchArrayConfig, StimulusConfig, TrialConfig, VideoConfig,
};
pub use error::SimulationError;
pub use event_loop::{VirtualController, VirtualLoop};
pub use input::ListenerSet;
pub use placement::{Placement, PlacementEngine};
pub use playback::{SimulatedStimulus, StimulusCall};
pub use sampler::{ExGaussian, ResponseCount, SampledResponse, SimulationProfile};
pub use session::{SessionConfig, SessionOutcome, SessionTrial, Summary, run_session, run_with};
pub use simulation::{SimulationMode, SimulationOptions, export_with_overrides, simulate};
pub use state::{Collaborators, TrialController, TrialEvent};
pub use trial::{TrialPlan, TrialTimestamps};
