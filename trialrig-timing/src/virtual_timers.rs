use std::collections::BTreeSet;
use std::time::Duration;

use crate::timer::{TimerHandle, TimerService};

/// Timer service driven by a manually advanced millisecond clock.
///
/// Due timers are popped in due-time order; timers due at the same
/// millisecond come out in registration order.
#[derive(Debug, Default, Clone)]
pub struct VirtualTimers {
    now_ms: u64,
    next_id: u64,
    pending: BTreeSet<(u64, TimerHandle)>,
}

impl VirtualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward. The clock never runs backwards.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Removes and returns the earliest timer due at or before the current time.
    pub fn pop_due(&mut self) -> Option<TimerHandle> {
        let first = *self.pending.first()?;
        if first.0 > self.now_ms {
            return None;
        }
        self.pending.remove(&first);
        Some(first.1)
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.first().map(|(due, _)| *due)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|(_, h)| *h == handle)
    }
}

impl TimerService for VirtualTimers {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn after(&mut self, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let due = self.now_ms.saturating_add(delay_ms);
        self.pending.insert((due, handle));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|(_, h)| *h != handle);
    }
}
