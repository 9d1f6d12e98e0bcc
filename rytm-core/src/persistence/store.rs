use rytm_types::{DeviceState, PatternState, CHANNEL_COUNT};

use super::layout::{self, PATTERN_ARRAY_SIZE, SAVE_SLOT_COUNT, SNAPSHOT_OFFSET, SNAPSHOT_SIZE};
use super::storage::NvStorage;
use crate::error::Result;

/// Result of reading the snapshot at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub state: DeviceState,
    /// The snapshot was missing or stale and defaults were written out.
    pub first_boot: bool,
}

/// Versioned live snapshot plus `SAVE_SLOT_COUNT` pattern banks.
///
/// Never call from the tick path: every operation is a synchronous write.
pub struct PersistentStateStore<S> {
    storage: S,
    defaults: DeviceState,
}

impl<S: NvStorage> PersistentStateStore<S> {
    pub fn new(storage: S, defaults: DeviceState) -> Self {
        Self { storage, defaults }
    }

    /// Restore the snapshot. A missing, stale or corrupt snapshot is a first
    /// boot: defaults are written to the snapshot and to every bank.
    pub fn load(&mut self) -> Result<LoadOutcome> {
        let mut buf = [0u8; SNAPSHOT_SIZE];
        self.storage.read(SNAPSHOT_OFFSET, &mut buf)?;

        if let Some(state) = layout::decode_snapshot(&buf) {
            log::info!(target: "persistence", "restored snapshot v{}", layout::SNAPSHOT_VERSION);
            return Ok(LoadOutcome {
                state,
                first_boot: false,
            });
        }

        log::info!(target: "persistence", "no valid snapshot, writing defaults");
        let state = self.defaults.clone();
        self.save_changes(&state)?;
        for bank in 0..SAVE_SLOT_COUNT {
            self.save_preset(bank, &state.patterns)?;
        }
        Ok(LoadOutcome {
            state,
            first_boot: true,
        })
    }

    pub fn save_changes(&mut self, state: &DeviceState) -> Result<()> {
        let bytes = layout::encode_snapshot(state)?;
        self.storage.write(SNAPSHOT_OFFSET, &bytes)
    }

    /// Write only the pattern array to `bank` (clamped).
    pub fn save_preset(&mut self, bank: u8, patterns: &[PatternState; CHANNEL_COUNT]) -> Result<()> {
        let bytes = layout::encode_patterns(patterns)?;
        log::info!(target: "persistence", "saving preset {}", bank.min(SAVE_SLOT_COUNT - 1));
        self.storage.write(layout::bank_offset(bank), &bytes)
    }

    pub fn load_preset(&mut self, bank: u8) -> Result<[PatternState; CHANNEL_COUNT]> {
        let mut buf = [0u8; PATTERN_ARRAY_SIZE];
        self.storage.read(layout::bank_offset(bank), &mut buf)?;
        log::info!(target: "persistence", "loaded preset {}", bank.min(SAVE_SLOT_COUNT - 1));
        layout::decode_patterns(&buf)
    }

    pub fn defaults(&self) -> &DeviceState {
        &self.defaults
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
