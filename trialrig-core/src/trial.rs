use serde::{Deserialize, Serialize};

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Setup,
    Presenting,
    AwaitingResponse,
    Terminating,
    Done,
}

impl TrialState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TrialState::Terminating | TrialState::Done)
    }
}

/// What ended a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Response,
    StimulusEnded,
    StopOffset,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    /// Timed media with keyboard responses.
    Video,
    /// Clickable image array scored against a target.
    VisualSearch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_states_are_finished() {
        let open = [
            TrialState::Setup,
            TrialState::Presenting,
            TrialState::AwaitingResponse,
        ];
        assert!(open.iter().all(|s| !s.is_finished()));
        assert!(TrialState::Terminating.is_finished());
        assert!(TrialState::Done.is_finished());
    }
}
