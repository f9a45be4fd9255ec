use std::time::{Duration, Instant};

/// Opaque id of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

/// Host timer service.
///
/// Firing is reported back to the trial as an event carrying the handle;
/// the service itself never invokes trial code.
pub trait TimerService {
    /// Milliseconds on the service's clock.
    fn now_ms(&self) -> u64;
    fn after(&mut self, delay: Duration) -> TimerHandle;
    /// Cancelling an unknown or already fired handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Wall clock with platform high-precision sleep
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn elapsed(&self, ts_ns: u64) -> Duration {
        Duration::from_nanos(self.now_ns().saturating_sub(ts_ns))
    }

    /// Blocks until `target_ms` after construction. Returns immediately if already past.
    pub fn sleep_until_ms(&self, target_ms: u64) {
        let target = Duration::from_millis(target_ms);
        let elapsed = self.start.elapsed();
        if target > elapsed {
            self.high_precision_sleep(target - elapsed);
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_until_waits_for_target() {
        let timer = HighPrecisionTimer::new();
        timer.sleep_until_ms(5);
        assert!(timer.now_ms() >= 5);
    }

    #[test]
    fn sleep_until_past_target_returns() {
        let timer = HighPrecisionTimer::new();
        timer.high_precision_sleep(Duration::from_millis(3));
        let before = timer.now_ns();
        timer.sleep_until_ms(1);
        assert!(timer.elapsed(before) < Duration::from_millis(50));
    }
}
