use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::Engine;
use crate::error::ModuleLoadError;
use crate::storage::StorageAdapter;

/// Binding slot for the engine module.
///
/// Owned by whoever initializes the engine rather than shared process-wide,
/// so two initializers never observe each other's module. Rebinding
/// replaces the previous module; nothing is torn down.
pub struct Api<M> {
    module: RwLock<Option<Arc<M>>>,
}

impl<M> Default for Api<M> {
    fn default() -> Self {
        Self {
            module: RwLock::new(None),
        }
    }
}

impl<M: Engine> Api<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a module. Returns the one it replaced, if any.
    pub async fn bind(&self, module: M) -> Option<Arc<M>> {
        self.module.write().await.replace(Arc::new(module))
    }

    pub async fn unbind(&self) -> Option<Arc<M>> {
        self.module.write().await.take()
    }

    pub async fn is_bound(&self) -> bool {
        self.module.read().await.is_some()
    }

    /// The currently bound module.
    pub async fn module(&self) -> Result<Arc<M>> {
        self.module
            .read()
            .await
            .clone()
            .ok_or_else(|| ModuleLoadError::NotBound.into())
    }

    /// Call `entry_point` on the bound module.
    pub async fn open(&self, entry_point: &str, storage: StorageAdapter) -> Result<M::Handle> {
        let module = self.module().await?;
        module.open(entry_point, storage).await
    }
}
