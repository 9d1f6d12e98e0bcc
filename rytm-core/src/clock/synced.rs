//! Square wave locked to an external clock.

use crate::io::InputEdge;

/// Toggles a virtual line every `duty_us`, polled from the control loop.
///
/// Stays idle until the first successful `retune`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncedDivider {
    duty_us: u64,
    deadline_us: u64,
    high: bool,
}

impl SyncedDivider {
    /// Adopt a new half-period. A zero duty keeps the previous schedule.
    pub fn retune(&mut self, duty_us: u64, now_us: u64) -> bool {
        if duty_us == 0 {
            return false;
        }
        self.duty_us = duty_us;
        self.deadline_us = now_us + duty_us;
        true
    }

    pub fn tick(&mut self, now_us: u64) -> InputEdge {
        if self.duty_us == 0 || now_us < self.deadline_us {
            return InputEdge::Unchanged;
        }
        self.deadline_us = now_us + self.duty_us;
        self.high = !self.high;
        if self.high {
            InputEdge::Rising
        } else {
            InputEdge::Falling
        }
    }

    /// Drop the schedule and return low.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn duty_us(&self) -> u64 {
        self.duty_us
    }

    pub fn deadline_us(&self) -> u64 {
        self.deadline_us
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}
