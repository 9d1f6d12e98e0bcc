//! Aggregate configuration of the whole module.

use serde::{Deserialize, Serialize};

use crate::state::channel::{ChannelConfig, TriggerMode};
use crate::state::clock::{ClockMod, ClockResolution, ClockSource, DEFAULT_TEMPO};
use crate::state::pattern::{PatternState, DEFAULT_PATTERN};
use crate::CHANNEL_COUNT;

/// Everything the persistence layer saves and restores.
///
/// Runtime-only state (step cursors, output levels, seed history) is not
/// part of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub patterns: [PatternState; CHANNEL_COUNT],
    pub channels: [ChannelConfig; CHANNEL_COUNT],
    pub clock_mods: [ClockMod; CHANNEL_COUNT],
    /// Device-wide mode applied by `CycleOutputMode`.
    pub output_mode: TriggerMode,
    pub selected_channel: u8,
    pub tempo: u8,
    pub clock_source: ClockSource,
    pub resolution: ClockResolution,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            patterns: [DEFAULT_PATTERN; CHANNEL_COUNT],
            channels: [ChannelConfig::default(); CHANNEL_COUNT],
            clock_mods: [ClockMod::default(); CHANNEL_COUNT],
            output_mode: TriggerMode::default(),
            selected_channel: 0,
            tempo: DEFAULT_TEMPO,
            clock_source: ClockSource::default(),
            resolution: ClockResolution::default(),
        }
    }
}
