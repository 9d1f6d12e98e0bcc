//! Non-volatile state: backends, byte layout and the snapshot/preset store.

pub mod layout;
pub mod storage;
mod store;

pub use layout::{bank_offset, SAVE_SLOT_COUNT, SNAPSHOT_SIZE};
pub use storage::{FileEeprom, MemoryEeprom, NvStorage};
pub use store::{LoadOutcome, PersistentStateStore};
