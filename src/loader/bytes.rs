use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::{ModuleLoader, ModuleOptions, resolve_bytes, resolve_bytes_in, sha256_hex};
use crate::engine::Engine;

/// Compiles checked module bytes into an engine for a particular runtime.
pub trait Instantiate: Send + Sync {
    type Module: Engine;

    fn instantiate(&self, bytes: &[u8]) -> Result<Self::Module>;
}

impl<F, M> Instantiate for F
where
    F: Fn(&[u8]) -> Result<M> + Send + Sync,
    M: Engine,
{
    type Module = M;

    fn instantiate(&self, bytes: &[u8]) -> Result<M> {
        self(bytes)
    }
}

/// Resolves the module bytes, then instantiates them.
pub struct BytesLoader<I> {
    runtime: I,
    home: Option<PathBuf>,
}

impl<I: Instantiate> BytesLoader<I> {
    pub fn new(runtime: I) -> Self {
        Self {
            runtime,
            home: None,
        }
    }

    /// Look for the default artifact under `home` instead of the user's
    /// home directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }
}

#[async_trait]
impl<I: Instantiate> ModuleLoader for BytesLoader<I> {
    type Module = I::Module;

    async fn load(&self, options: &ModuleOptions) -> Result<I::Module> {
        let bytes = match &self.home {
            Some(home) => resolve_bytes_in(options, home).await?,
            None => resolve_bytes(options).await?,
        };
        debug!(sha256 = %sha256_hex(&bytes), "instantiating engine module");
        self.runtime.instantiate(&bytes)
    }
}
