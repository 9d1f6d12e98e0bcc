//! Euclidean pattern configuration types.

use serde::{Deserialize, Serialize};

/// Upper bound on `steps + padding` for any channel.
pub const MAX_PATTERN_LEN: usize = 32;

/// Pattern used for every channel on first boot.
pub const DEFAULT_PATTERN: PatternState = PatternState {
    steps: 16,
    hits: 4,
    offset: 0,
    padding: 0,
};

/// The four user-facing attributes of a Euclidean pattern.
///
/// This is also the persisted per-channel record (4 unsigned bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternState {
    pub steps: u8,
    pub hits: u8,
    pub offset: u8,
    pub padding: u8,
}

impl PatternState {
    pub const fn new(steps: u8, hits: u8, offset: u8, padding: u8) -> Self {
        Self {
            steps,
            hits,
            offset,
            padding,
        }
    }

    /// Length of one full cycle, rest and padding steps included.
    pub fn cycle_len(&self) -> usize {
        self.steps as usize + self.padding as usize
    }

    /// A pattern with zero steps never advances and never fires.
    pub fn is_muted(&self) -> bool {
        self.steps == 0
    }
}

/// Classification of a single slot in a generated pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    #[default]
    Rest,
    Hit,
    Pad,
}

impl StepKind {
    pub fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }

    /// Single-character glyph, used by text front ends.
    pub fn glyph(self) -> char {
        match self {
            Self::Hit => 'x',
            Self::Rest => '.',
            Self::Pad => '_',
        }
    }
}
