pub mod timer;
pub mod virtual_timers;

pub use timer::{HighPrecisionTimer, TimerHandle, TimerService};
pub use virtual_timers::VirtualTimers;
