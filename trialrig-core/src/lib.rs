pub mod error;
pub mod input;
pub mod record;
pub mod response;
pub mod sink;
pub mod stimulus;
pub mod trial;

pub use error::ConfigError;
pub use input::{InputCapture, ListenerHandle};
pub use record::{ExportedRecord, Position, ResponseRecord, SearchData, VideoData};
pub use response::{Channel, Choice, ChoiceSet, ResponseEvent};
pub use sink::TrialSink;
pub use stimulus::{StimulusHandle, StimulusSignal};
pub use trial::{TerminationReason, TrialKind, TrialState};
