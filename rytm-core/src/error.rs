//! Error types for rytm-core.
//!
//! Only non-volatile storage can fail. Everything on the tick path clamps or
//! ignores bad input instead.

use thiserror::Error;

/// Errors from reading or writing the non-volatile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be opened, read or written.
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded into its fixed-size slot.
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// A record could not be decoded from its slot.
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Access past the end of the device.
    #[error("out of bounds: {len} bytes at offset {offset} (capacity {capacity})")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
