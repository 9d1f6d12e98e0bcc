//! Commands issued by the front end.
//!
//! A front end (panel UI, serial console, test harness) decodes user input
//! into these commands and hands them to the core dispatcher. Channel indices
//! outside `0..CHANNEL_COUNT` are clamped by the dispatcher, never rejected.

use serde::{Deserialize, Serialize};

use crate::state::{ClockSource, TriggerMode};

/// Which pattern attribute a `ChangePattern` command adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternParam {
    Steps,
    Hits,
    Offset,
    Padding,
}

/// User intents consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Adjust one pattern attribute of a channel by ±1.
    ChangePattern {
        channel: usize,
        param: PatternParam,
        delta: i8,
    },
    /// Adjust a channel's probability by whole units of `PROB_SCALE`.
    ChangeProbability { channel: usize, delta: i8 },
    /// Set a channel's probability from a fraction in `0.0..=1.0`.
    SetProbability { channel: usize, fraction: f32 },
    SetMode { channel: usize, mode: TriggerMode },
    /// Rotate the device-wide output mode and apply it to every channel.
    CycleOutputMode(i8),
    ChangeClockMod { channel: usize, delta: i8 },
    ChangeTempo(i16),
    SetClockSource(ClockSource),
    CycleResolution(i8),
    /// Move the channel selection, wrapping at both ends.
    SelectChannel(i8),
    /// Rewind a channel's seed history by one step.
    PrevSeed { channel: usize },
    /// Step a channel's seed history forward, minting a new seed at the frontier.
    NextSeed { channel: usize },
    /// Fire a ratchet burst on a channel.
    Stutter { channel: usize },
    /// Park every pattern cursor so the next pulse plays step 0.
    Reset,
    SaveChanges,
    LoadState,
    SavePreset(u8),
    LoadPreset(u8),
}

impl Command {
    /// Whether this command touches non-volatile storage.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::SaveChanges | Self::LoadState | Self::SavePreset(_) | Self::LoadPreset(_)
        )
    }
}
