//! Caller-supplied persistence and the adapter that reshapes it for the engine.
//!
//! Callers implement [`Backend`] (or use one of the bundled backends); the
//! engine only ever sees a [`StorageAdapter`] wrapped around it.

pub mod disk;
pub mod memory;
pub mod sqlite;
pub mod wrap;

pub use wrap::StorageAdapter;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// File metadata reported by [`BackendFile::stat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub size: u64,
}

/// A storage backend: hands out files by name.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn file(&self, name: &str) -> Result<Box<dyn BackendFile>>;
}

/// One named file inside a [`Backend`].
#[async_trait]
pub trait BackendFile: Send + Sync {
    async fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>>;
    async fn write(&self, offset: u64, data: &[u8]) -> Result<()>;
    /// Zero out a range. Backends without hole support may ignore it.
    async fn del(&self, _offset: u64, _size: u64) -> Result<()> {
        Ok(())
    }
    async fn truncate(&self, size: u64) -> Result<()>;
    async fn stat(&self) -> Result<Stat>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// Byte-vector primitives shared by the in-memory and SQLite backends.

pub(crate) fn read_range(buf: &[u8], offset: u64, size: u64) -> Result<Vec<u8>> {
    let end = offset.checked_add(size).unwrap_or(u64::MAX);
    if end > buf.len() as u64 {
        bail!(
            "read out of bounds: {}..{} of {} bytes",
            offset,
            end,
            buf.len()
        );
    }
    Ok(buf[offset as usize..end as usize].to_vec())
}

pub(crate) fn write_at(buf: &mut Vec<u8>, offset: u64, data: &[u8]) -> Result<()> {
    let end = offset
        .checked_add(data.len() as u64)
        .ok_or_else(|| anyhow!("write out of range: {} bytes at offset {}", data.len(), offset))?;
    if end > buf.len() as u64 {
        resize(buf, end)?;
    }
    let start = offset as usize;
    buf[start..start + data.len()].copy_from_slice(data);
    Ok(())
}

/// Shrink or zero-extend `buf` to `size` bytes. Fails instead of aborting
/// when the size cannot be allocated.
pub(crate) fn resize(buf: &mut Vec<u8>, size: u64) -> Result<()> {
    let size = usize::try_from(size).with_context(|| format!("size {size} exceeds address space"))?;
    if size > buf.len() {
        buf.try_reserve_exact(size - buf.len())
            .with_context(|| format!("cannot grow buffer to {size} bytes"))?;
    }
    buf.resize(size, 0);
    Ok(())
}

pub(crate) fn zero_range(buf: &mut [u8], offset: u64, size: u64) {
    let len = buf.len() as u64;
    let start = offset.min(len) as usize;
    let end = offset.saturating_add(size).min(len) as usize;
    buf[start..end].fill(0);
}
