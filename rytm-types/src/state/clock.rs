//! Clock source, resolution and per-channel modifier types.

use serde::{Deserialize, Serialize};

/// Resolution of the internal base clock, in pulses per quarter note.
pub const BASE_PPQN: u32 = 24;

pub const MIN_TEMPO: u8 = 40;
pub const MAX_TEMPO: u8 = 240;
pub const DEFAULT_TEMPO: u8 = 130;

/// Where channel pulses come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockSource {
    /// Periodic timer running at the configured tempo.
    #[default]
    Internal,
    /// Square waves derived from pulses on the clock input.
    External,
}

impl ClockSource {
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Pulses per quarter note expected on the clock input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockResolution {
    Ppqn4,
    Ppqn8,
    #[default]
    Ppqn24,
}

impl ClockResolution {
    pub const ALL: [ClockResolution; 3] = [Self::Ppqn4, Self::Ppqn8, Self::Ppqn24];

    pub fn ppqn(self) -> u32 {
        match self {
            Self::Ppqn4 => 4,
            Self::Ppqn8 => 8,
            Self::Ppqn24 => 24,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Ppqn4 => 0,
            Self::Ppqn8 => 1,
            Self::Ppqn24 => 2,
        }
    }

    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Ppqn4,
            1 => Self::Ppqn8,
            _ => Self::Ppqn24,
        }
    }

    pub fn cycle(self, delta: i8) -> Self {
        let len = Self::ALL.len() as i16;
        let idx = (self.index() as i16 + delta as i16).rem_euclid(len);
        Self::ALL[idx as usize]
    }
}

/// Multiply or divide ratio relative to one quarter note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockFactor {
    Multiply(u32),
    Divide(u32),
}

/// Per-channel clock modifier, from ×8 down to ÷128.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockMod {
    Mult8,
    Mult6,
    Mult4,
    Mult3,
    Mult2,
    #[default]
    Mult1,
    Div2,
    Div3,
    Div4,
    Div6,
    Div8,
    Div12,
    Div16,
    Div24,
    Div32,
    Div64,
    Div128,
}

/// Base-clock ticks between pulses, indexed like [`ClockMod::ALL`].
const CLOCK_MOD_TICKS: [u32; 17] = [
    3, 4, 6, 8, 12, 24, 48, 72, 96, 144, 192, 288, 384, 576, 768, 1536, 3072,
];

impl ClockMod {
    pub const ALL: [ClockMod; 17] = [
        Self::Mult8,
        Self::Mult6,
        Self::Mult4,
        Self::Mult3,
        Self::Mult2,
        Self::Mult1,
        Self::Div2,
        Self::Div3,
        Self::Div4,
        Self::Div6,
        Self::Div8,
        Self::Div12,
        Self::Div16,
        Self::Div24,
        Self::Div32,
        Self::Div64,
        Self::Div128,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Base-clock ticks between two channel pulses.
    pub fn ticks(self) -> u32 {
        CLOCK_MOD_TICKS[self.index() as usize]
    }

    pub fn factor(self) -> ClockFactor {
        let ticks = self.ticks();
        if ticks < BASE_PPQN {
            ClockFactor::Multiply(BASE_PPQN / ticks)
        } else {
            ClockFactor::Divide(ticks / BASE_PPQN)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mult8 => "x8",
            Self::Mult6 => "x6",
            Self::Mult4 => "x4",
            Self::Mult3 => "x3",
            Self::Mult2 => "x2",
            Self::Mult1 => "x1",
            Self::Div2 => "/2",
            Self::Div3 => "/3",
            Self::Div4 => "/4",
            Self::Div6 => "/6",
            Self::Div8 => "/8",
            Self::Div12 => "/12",
            Self::Div16 => "/16",
            Self::Div24 => "/24",
            Self::Div32 => "/32",
            Self::Div64 => "/64",
            Self::Div128 => "/128",
        }
    }

    /// Rotate through the table by `delta`, wrapping in both directions.
    pub fn cycle(self, delta: i8) -> Self {
        let len = Self::ALL.len() as i16;
        let idx = (self.index() as i16 + delta as i16).rem_euclid(len);
        Self::ALL[idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_table_matches_factors() {
        for m in ClockMod::ALL {
            match m.factor() {
                ClockFactor::Multiply(n) => assert_eq!(m.ticks() * n, BASE_PPQN),
                ClockFactor::Divide(n) => assert_eq!(m.ticks(), BASE_PPQN * n),
            }
        }
    }

    #[test]
    fn named_factors() {
        assert_eq!(ClockMod::Mult8.factor(), ClockFactor::Multiply(8));
        assert_eq!(ClockMod::Mult1.factor(), ClockFactor::Divide(1));
        assert_eq!(ClockMod::Div6.factor(), ClockFactor::Divide(6));
        assert_eq!(ClockMod::Div128.factor(), ClockFactor::Divide(128));
    }

    #[test]
    fn mod_cycle_wraps() {
        assert_eq!(ClockMod::Div128.cycle(1), ClockMod::Mult8);
        assert_eq!(ClockMod::Mult8.cycle(-1), ClockMod::Div128);
        assert_eq!(ClockMod::Mult1.cycle(2), ClockMod::Div3);
    }

    #[test]
    fn mod_index_round_trips() {
        for m in ClockMod::ALL {
            assert_eq!(ClockMod::from_index(m.index()), m);
        }
        assert_eq!(ClockMod::from_index(200), ClockMod::Mult1);
    }
}
