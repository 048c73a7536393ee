//! Deadline arithmetic on top of [fugit_timer::Timer]
//!
//! All waits are busy-polled against [Timer::now]. The timer is never (re)started, so timers
//! which reset their counter in [Timer::start] are supported as well.
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// Absolute point in time after which a pending wait is abandoned
///
/// Based on [Timer::now], so multiple deadlines may be pending at the same time on a single timer.
#[derive(Copy, Clone, Debug)]
pub struct Deadline<const TIMER_HZ: u32> {
    start: TimerInstantU32<TIMER_HZ>,
    duration: TimerDurationU32<TIMER_HZ>,
}

impl<const TIMER_HZ: u32> Deadline<TIMER_HZ> {
    /// Starts a new deadline which expires after the given duration
    pub fn start<T: Timer<TIMER_HZ>>(timer: &mut T, duration: TimerDurationU32<TIMER_HZ>) -> Self {
        Self {
            start: timer.now(),
            duration,
        }
    }

    /// Shorthand for [Deadline::start] with milliseconds
    pub fn start_ms<T: Timer<TIMER_HZ>>(timer: &mut T, duration: u32) -> Self {
        Self::start(timer, TimerDurationU32::millis(duration))
    }

    /// Returns true once the duration has elapsed
    ///
    /// A clock reading before the start can't be measured against, so the deadline counts as expired.
    pub fn is_expired<T: Timer<TIMER_HZ>>(&self, timer: &mut T) -> bool {
        match timer.now().checked_duration_since(self.start) {
            Some(elapsed) => elapsed >= self.duration,
            None => true,
        }
    }
}

/// Blocks for the given milliseconds
pub fn delay_ms<T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(timer: &mut T, duration: u32) {
    let deadline = Deadline::start_ms(timer, duration);
    while !deadline.is_expired(timer) {}
}
