use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Backend, BackendFile, Stat, read_range, resize, write_at, zero_range};

/// Volatile backend: every name maps to a byte vector.
/// Handles opened under the same name share contents.
#[derive(Default)]
pub struct MemoryBackend {
    files: Mutex<HashMap<String, Arc<Mutex<Vec<u8>>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every file opened so far, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn file(&self, name: &str) -> Result<Box<dyn BackendFile>> {
        let data = Arc::clone(self.files.lock().await.entry(name.to_string()).or_default());
        Ok(Box::new(MemoryFile { data }))
    }
}

struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl BackendFile for MemoryFile {
    async fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        read_range(&self.data.lock().await, offset, size)
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        write_at(&mut *self.data.lock().await, offset, data)
    }

    async fn del(&self, offset: u64, size: u64) -> Result<()> {
        zero_range(&mut self.data.lock().await, offset, size);
        Ok(())
    }

    async fn truncate(&self, size: u64) -> Result<()> {
        resize(&mut *self.data.lock().await, size)
    }

    async fn stat(&self) -> Result<Stat> {
        Ok(Stat {
            size: self.data.lock().await.len() as u64,
        })
    }
}
