//! Byte layout of the live snapshot and the preset banks.
//!
//! ```text
//! offset  size  field
//!      0     9  tag "EUCLIDEAN"
//!      9     1  version
//!     10    24  6 x {steps, hits, offset, padding}
//!     34     1  output mode
//!     35     1  selected channel
//!     36     1  tempo
//!     37     1  internal clock flag
//!     38     1  clock input resolution
//!     39    12  6 x {mode, probability}
//!     51     6  6 x clock modifier
//!     57        bank 0, then 24 bytes per bank
//! ```
//!
//! Records are encoded with bincode's legacy configuration: fixed-width
//! little-endian integers and arrays without a length prefix. Enums are
//! stored as their one-byte index, never through serde's variant encoding.

use bincode::config::{self, Configuration, Fixint, LittleEndian, NoLimit};
use serde::{Deserialize, Serialize};

use rytm_types::{
    ChannelConfig, ClockMod, ClockResolution, ClockSource, DeviceState, PatternState,
    TriggerMode, CHANNEL_COUNT, MAX_TEMPO, MIN_TEMPO, PROB_SCALE,
};

use crate::error::Result;

pub const SNAPSHOT_TAG: [u8; 9] = *b"EUCLIDEAN";
pub const SNAPSHOT_VERSION: u8 = 5;

pub const PATTERN_RECORD_SIZE: usize = 4;
pub const PATTERN_ARRAY_SIZE: usize = PATTERN_RECORD_SIZE * CHANNEL_COUNT;
pub const SNAPSHOT_SIZE: usize = 9 + 1 + PATTERN_ARRAY_SIZE + 5 + 2 * CHANNEL_COUNT + CHANNEL_COUNT;

pub const SAVE_SLOT_COUNT: u8 = 4;

/// Address of the snapshot.
pub const SNAPSHOT_OFFSET: usize = 0;

/// Address of preset `bank`, clamped to the last bank.
pub fn bank_offset(bank: u8) -> usize {
    let bank = bank.min(SAVE_SLOT_COUNT - 1) as usize;
    SNAPSHOT_OFFSET + SNAPSHOT_SIZE + PATTERN_ARRAY_SIZE * bank
}

/// Bytes needed to hold the snapshot and every bank.
pub const fn required_capacity() -> usize {
    SNAPSHOT_SIZE + PATTERN_ARRAY_SIZE * SAVE_SLOT_COUNT as usize
}

fn wire() -> Configuration<LittleEndian, Fixint, NoLimit> {
    config::legacy()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ChannelRecord {
    mode: u8,
    probability: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
    tag: [u8; 9],
    version: u8,
    patterns: [PatternState; CHANNEL_COUNT],
    output_mode: u8,
    selected_channel: u8,
    tempo: u8,
    internal_clock: bool,
    resolution: u8,
    channels: [ChannelRecord; CHANNEL_COUNT],
    clock_mods: [u8; CHANNEL_COUNT],
}

impl From<&DeviceState> for Snapshot {
    fn from(state: &DeviceState) -> Self {
        Self {
            tag: SNAPSHOT_TAG,
            version: SNAPSHOT_VERSION,
            patterns: state.patterns,
            output_mode: state.output_mode.index(),
            selected_channel: state.selected_channel,
            tempo: state.tempo,
            internal_clock: state.clock_source.is_internal(),
            resolution: state.resolution.index(),
            channels: state.channels.map(|c| ChannelRecord {
                mode: c.mode.index(),
                probability: c.probability,
            }),
            clock_mods: state.clock_mods.map(ClockMod::index),
        }
    }
}

impl Snapshot {
    fn is_current(&self) -> bool {
        self.tag == SNAPSHOT_TAG && self.version == SNAPSHOT_VERSION
    }

    fn into_state(self) -> DeviceState {
        DeviceState {
            patterns: self.patterns,
            channels: self.channels.map(|c| {
                ChannelConfig::new(TriggerMode::from_index(c.mode), c.probability.min(PROB_SCALE))
            }),
            clock_mods: self.clock_mods.map(ClockMod::from_index),
            output_mode: TriggerMode::from_index(self.output_mode),
            selected_channel: self.selected_channel.min(CHANNEL_COUNT as u8 - 1),
            tempo: self.tempo.clamp(MIN_TEMPO, MAX_TEMPO),
            clock_source: if self.internal_clock {
                ClockSource::Internal
            } else {
                ClockSource::External
            },
            resolution: ClockResolution::from_index(self.resolution),
        }
    }
}

pub fn encode_snapshot(state: &DeviceState) -> Result<[u8; SNAPSHOT_SIZE]> {
    let mut buf = [0u8; SNAPSHOT_SIZE];
    bincode::serde::encode_into_slice(Snapshot::from(state), &mut buf, wire())?;
    Ok(buf)
}

/// Decode a snapshot. `None` when the bytes do not hold a snapshot of the
/// current tag and version, including erased or corrupt memory.
pub fn decode_snapshot(bytes: &[u8]) -> Option<DeviceState> {
    let (snapshot, _): (Snapshot, usize) =
        bincode::serde::decode_from_slice(bytes, wire()).ok()?;
    snapshot.is_current().then(|| snapshot.into_state())
}

pub fn encode_patterns(patterns: &[PatternState; CHANNEL_COUNT]) -> Result<[u8; PATTERN_ARRAY_SIZE]> {
    let mut buf = [0u8; PATTERN_ARRAY_SIZE];
    bincode::serde::encode_into_slice(patterns, &mut buf, wire())?;
    Ok(buf)
}

pub fn decode_patterns(bytes: &[u8]) -> Result<[PatternState; CHANNEL_COUNT]> {
    let (patterns, _) = bincode::serde::decode_from_slice(bytes, wire())?;
    Ok(patterns)
}
