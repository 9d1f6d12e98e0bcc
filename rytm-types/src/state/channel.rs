//! Per-channel trigger configuration.

use serde::{Deserialize, Serialize};

/// Fixed denominator for integer probabilities.
pub const PROB_SCALE: u8 = 100;

/// How a channel reacts to the rising and falling edges of its source pulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Short pulse: high on a successful roll, low on the falling edge or
    /// after the trigger width, whichever comes first.
    #[default]
    Trigger,
    /// High on a successful roll, held until the source pulse falls.
    Gate,
    /// Each successful roll toggles the level; falling edges are ignored.
    Flip,
}

impl TriggerMode {
    pub const ALL: [TriggerMode; 3] = [Self::Trigger, Self::Gate, Self::Flip];

    pub fn name(self) -> &'static str {
        match self {
            Self::Trigger => "TRIG",
            Self::Gate => "GATE",
            Self::Flip => "FLIP",
        }
    }

    /// Stable index used by the persisted record.
    pub fn index(self) -> u8 {
        match self {
            Self::Trigger => 0,
            Self::Gate => 1,
            Self::Flip => 2,
        }
    }

    /// Inverse of [`index`](Self::index). Unknown values fall back to the default.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Gate,
            2 => Self::Flip,
            _ => Self::Trigger,
        }
    }

    /// Rotate through the modes by `delta`, wrapping in both directions.
    pub fn cycle(self, delta: i8) -> Self {
        let len = Self::ALL.len() as i16;
        let idx = (self.index() as i16 + delta as i16).rem_euclid(len);
        Self::ALL[idx as usize]
    }
}

/// Trigger settings owned by one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub mode: TriggerMode,
    /// Numerator over [`PROB_SCALE`].
    pub probability: u8,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::Trigger,
            probability: PROB_SCALE,
        }
    }
}

impl ChannelConfig {
    pub fn new(mode: TriggerMode, probability: u8) -> Self {
        Self {
            mode,
            probability: probability.min(PROB_SCALE),
        }
    }
}
