pub mod api;
pub mod mock;

pub use api::Api;

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::StorageAdapter;

/// A byte-addressable file as the engine sees it.
#[async_trait]
pub trait RandomAccess: Send + Sync {
    async fn write(&mut self, offset: u64, data: &[u8]) -> Result<()>;
    async fn read(&mut self, offset: u64, length: u64) -> Result<Vec<u8>>;
    async fn del(&mut self, offset: u64, length: u64) -> Result<()>;
    async fn truncate(&mut self, length: u64) -> Result<()>;
    async fn len(&mut self) -> Result<u64>;
    async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
    async fn sync_all(&mut self) -> Result<()>;
}

/// Opens named files for the engine. The engine may keep this for its
/// whole lifetime and open files lazily.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn open(&self, name: &str) -> Result<Box<dyn RandomAccess>>;
}

/// The compiled computation module, once bound.
///
/// Its internals are opaque. The only capability this crate relies on is
/// calling a named entry point with an adapted storage and getting back a
/// handle. Implementations must fail with
/// [`EngineInitError::MissingExport`](crate::error::EngineInitError::MissingExport)
/// when asked for an entry point they do not export.
#[async_trait]
pub trait Engine: Send + Sync {
    type Handle: Send;

    /// Names of the entry points this module exports.
    fn exports(&self) -> Vec<String>;

    async fn open(&self, entry_point: &str, storage: StorageAdapter) -> Result<Self::Handle>;
}
