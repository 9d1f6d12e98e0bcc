//! Byte-addressed non-volatile storage backends.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Value of a never-written EEPROM byte.
pub const ERASED: u8 = 0xFF;

/// Default device size, matching a 1 KiB EEPROM.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Synchronous, bounded-latency byte storage.
pub trait NvStorage {
    fn capacity(&self) -> usize;
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StoreError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// RAM-backed device, erased on creation.
#[derive(Debug, Clone)]
pub struct MemoryEeprom<const N: usize = DEFAULT_CAPACITY> {
    bytes: [u8; N],
}

impl<const N: usize> Default for MemoryEeprom<N> {
    fn default() -> Self {
        Self { bytes: [ERASED; N] }
    }
}

impl<const N: usize> MemoryEeprom<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite raw bytes, bypassing the trait. Used to simulate corruption.
    pub fn poke(&mut self, offset: usize, data: &[u8]) {
        let end = (offset + data.len()).min(N);
        if offset < end {
            self.bytes[offset..end].copy_from_slice(&data[..end - offset]);
        }
    }
}

impl<const N: usize> NvStorage for MemoryEeprom<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len(), N)?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_bounds(offset, data.len(), N)?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Fixed-size image file standing in for an EEPROM.
///
/// A missing or short file is padded with erased bytes on open.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    file: File,
    capacity: usize,
}

impl FileEeprom {
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len() as usize;
        if len < capacity {
            log::info!(target: "persistence", "initializing eeprom image {}", path.display());
            file.seek(SeekFrom::Start(len as u64))?;
            file.write_all(&vec![ERASED; capacity - len])?;
            file.sync_data()?;
        }

        Ok(Self {
            path,
            file,
            capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvStorage for FileEeprom {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_bounds(offset, data.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        Ok(())
    }
}
