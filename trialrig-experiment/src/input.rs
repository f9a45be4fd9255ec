use trialrig_core::{Choice, ChoiceSet, InputCapture, ListenerHandle};

#[derive(Debug, Clone)]
struct Listener {
    handle: ListenerHandle,
    valid: ChoiceSet,
    persist: bool,
}

/// In-process input capture: filters raw inputs against registered listeners
#[derive(Debug, Default, Clone)]
pub struct ListenerSet {
    next_id: u64,
    listeners: Vec<Listener>,
    registrations: usize,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a raw input to the active listeners. Returns true when one accepted it.
    pub fn dispatch(&mut self, choice: &Choice) -> bool {
        let Some(index) = self.listeners.iter().position(|l| l.valid.accepts(choice)) else {
            return false;
        };
        if !self.listeners[index].persist {
            self.listeners.remove(index);
        }
        true
    }

    pub fn active(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_active(&self, handle: ListenerHandle) -> bool {
        self.listeners.iter().any(|l| l.handle == handle)
    }

    /// Total listeners ever registered.
    pub fn registrations(&self) -> usize {
        self.registrations
    }
}

impl InputCapture for ListenerSet {
    fn register_response_listener(&mut self, valid: &ChoiceSet, persist: bool) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.registrations += 1;
        self.listeners.push(Listener {
            handle,
            valid: valid.clone(),
            persist,
        });
        handle
    }

    fn cancel_all(&mut self) {
        self.listeners.clear();
    }
}
