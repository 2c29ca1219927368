//! Question countdown
//!
//! The [`Timer`] holds the remaining seconds of the current question and
//! whether the countdown is running. It has no clock of its own: the
//! session schedules tick alarms and feeds them back through
//! [`Timer::tick`]. Every command that changes the running state bumps the
//! timer's epoch, so ticks scheduled before a reset or a pause can be
//! recognized as stale and dropped.

use serde::{Deserialize, Serialize};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The timer was paused or already at zero; nothing changed
    Ignored,
    /// One second elapsed, the value is the remaining time
    Counted(u64),
    /// One second elapsed and the warning threshold was reached
    Warning(u64),
    /// The countdown reached zero; reported once per reset
    Expired,
}

/// A per-question countdown in whole seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Seconds left on the clock
    remaining: u64,
    /// Whether ticks currently count down
    running: bool,
    /// Whether expiry was already reported since the last reset
    #[serde(skip)]
    expired: bool,
    /// Remaining seconds at which a warning is reported, 0 disables it
    #[serde(skip)]
    warning_at: u64,
    /// Bumped whenever scheduled ticks become stale
    #[serde(skip)]
    epoch: u64,
}

impl Timer {
    /// Creates a paused timer
    pub fn new(seconds: u64, warning_at: u64) -> Self {
        Self {
            remaining: seconds,
            running: false,
            expired: false,
            warning_at,
            epoch: 0,
        }
    }

    /// Continues the epoch sequence of a timer this one replaces
    #[must_use]
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Seconds left on the clock
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the countdown is running
    pub fn running(&self) -> bool {
        self.running
    }

    /// Epoch that scheduled ticks must carry to be accepted
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Sets the remaining time and pauses
    pub fn reset(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.running = false;
        self.expired = false;
        self.epoch += 1;
    }

    /// Starts the countdown
    ///
    /// Returns `true` if the timer was paused before, i.e. when the caller
    /// needs to schedule a new tick.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.epoch += 1;
        true
    }

    /// Pauses the countdown
    ///
    /// Returns `true` if the timer was running before.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.epoch += 1;
        true
    }

    /// Overrides the remaining time without touching the running flag
    pub fn set_remaining(&mut self, seconds: u64) {
        self.remaining = seconds;
    }

    /// Counts down one second
    pub fn tick(&mut self) -> Tick {
        if !self.running || self.remaining == 0 {
            return Tick::Ignored;
        }

        self.remaining -= 1;

        if self.remaining == 0 {
            self.running = false;
            self.epoch += 1;
            if self.expired {
                return Tick::Ignored;
            }
            self.expired = true;
            return Tick::Expired;
        }

        if self.remaining == self.warning_at {
            Tick::Warning(self.remaining)
        } else {
            Tick::Counted(self.remaining)
        }
    }
}
