//! Ratchet bursts timed from a channel's own pulse rate.

use crate::io::InputEdge;

/// Fires `repeats` short pulses on demand, each `factor` times faster than
/// the most recently measured source pulse.
///
/// Like [`SyncedDivider`](super::SyncedDivider) it is polled from the control
/// loop and toggles on deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stutter {
    factor: u8,
    repeats: u8,
    last_clock_us: Option<u64>,
    duty_us: u64,
    deadline_us: u64,
    /// Toggles left in the running burst.
    remaining: u16,
    high: bool,
}

impl Stutter {
    pub fn new(factor: u8, repeats: u8) -> Self {
        Self {
            factor: factor.max(1),
            repeats,
            last_clock_us: None,
            duty_us: 0,
            deadline_us: 0,
            remaining: 0,
            high: false,
        }
    }

    /// Measure one source pulse. A zero period keeps the last duty.
    pub fn process_clock(&mut self, now_us: u64) {
        let last = self.last_clock_us.replace(now_us);
        let Some(period) = last.and_then(|last| now_us.checked_sub(last)) else {
            return;
        };
        let duty = period / self.factor as u64 / 2;
        if duty > 0 {
            self.duty_us = duty;
        }
    }

    /// Begin a burst. Restarts one already running.
    ///
    /// Returns `Unchanged` until a source period has been measured.
    pub fn start(&mut self, now_us: u64) -> InputEdge {
        if self.duty_us == 0 || self.repeats == 0 {
            return InputEdge::Unchanged;
        }
        self.high = true;
        self.deadline_us = now_us + self.duty_us;
        self.remaining = self.repeats as u16 * 2 - 1;
        InputEdge::Rising
    }

    pub fn tick(&mut self, now_us: u64) -> InputEdge {
        if self.remaining == 0 || now_us < self.deadline_us {
            return InputEdge::Unchanged;
        }
        self.remaining -= 1;
        self.deadline_us = now_us + self.duty_us;
        self.high = !self.high;
        if self.high {
            InputEdge::Rising
        } else {
            InputEdge::Falling
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn duty_us(&self) -> u64 {
        self.duty_us
    }

    pub fn factor(&self) -> u8 {
        self.factor
    }

    pub fn repeats(&self) -> u8 {
        self.repeats
    }
}
