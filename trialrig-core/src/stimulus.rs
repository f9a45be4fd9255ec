/// Defines the presentation surface a trial drives
///
/// Implementations own the actual media element. Notifications flow back to
/// the controller as [`StimulusSignal`]s through whatever event loop hosts it.
pub trait StimulusHandle {
    fn play(&mut self);
    fn pause(&mut self);
    /// Starts a seek; completion is reported with [`StimulusSignal::SeekCompleted`].
    fn seek_to(&mut self, seconds: f64);
    fn current_position(&self) -> f64;
    fn set_visible(&mut self, visible: bool);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);

    /// Visual feedback hook invoked after each accepted response.
    fn mark_responded(&mut self) {}
}

/// Notifications raised by a stimulus handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StimulusSignal {
    Ready,
    SeekCompleted,
    PositionUpdate(f64),
    Ended,
}
