use crate::response::ChoiceSet;

/// Opaque id of a registered response listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Host-side keyboard/pointer capture.
///
/// Accepted inputs are delivered to the controller as
/// `TrialEvent::Response`; rejected ones never reach it.
pub trait InputCapture {
    /// A listener with `persist == false` is released after its first accepted input.
    fn register_response_listener(&mut self, valid: &ChoiceSet, persist: bool) -> ListenerHandle;
    fn cancel_all(&mut self);
}
