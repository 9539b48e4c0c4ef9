use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{Backend, BackendFile};
use crate::engine::{RandomAccess, Storage};

/// The engine-facing view of a caller's [`Backend`].
///
/// Wrapping does no I/O. The adapter shares the backend rather than owning
/// it, and the engine may keep the adapter for as long as it lives.
#[derive(Clone)]
pub struct StorageAdapter {
    backend: Arc<dyn Backend>,
}

impl StorageAdapter {
    pub fn wrap(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAdapter").finish_non_exhaustive()
    }
}

#[async_trait]
impl Storage for StorageAdapter {
    async fn open(&self, name: &str) -> Result<Box<dyn RandomAccess>> {
        let file = self.backend.file(name).await?;
        Ok(Box::new(FileAdapter { file }))
    }
}

/// Maps [`RandomAccess`] calls onto a [`BackendFile`].
struct FileAdapter {
    file: Box<dyn BackendFile>,
}

#[async_trait]
impl RandomAccess for FileAdapter {
    async fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.file.write(offset, data).await
    }

    async fn read(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.file.read(offset, length).await
    }

    async fn del(&mut self, offset: u64, length: u64) -> Result<()> {
        self.file.del(offset, length).await
    }

    async fn truncate(&mut self, length: u64) -> Result<()> {
        self.file.truncate(length).await
    }

    async fn len(&mut self) -> Result<u64> {
        Ok(self.file.stat().await?.size)
    }

    async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.file.stat().await?.size == 0)
    }

    async fn sync_all(&mut self) -> Result<()> {
        self.file.close().await
    }
}
