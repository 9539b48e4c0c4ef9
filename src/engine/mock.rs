use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::Engine;
use crate::consts::{MAX_DIMENSIONS, MIN_DIMENSIONS, entry_point};
use crate::error::EngineInitError;
use crate::storage::StorageAdapter;

type ErrorFactory = Box<dyn Fn() -> anyhow::Error + Send + Sync>;

enum Outcome<H> {
    Handle(H),
    Fail(ErrorFactory),
}

/// A stand-in engine for tests. Returns a fixed handle (or a fixed error)
/// and records every entry point call along with the storage it was given.
/// Clones share the call log.
pub struct MockEngine<H> {
    exports: Vec<String>,
    outcome: Arc<Outcome<H>>,
    opened: Arc<Mutex<Vec<(String, StorageAdapter)>>>,
}

impl<H> Clone for MockEngine<H> {
    fn clone(&self) -> Self {
        Self {
            exports: self.exports.clone(),
            outcome: Arc::clone(&self.outcome),
            opened: Arc::clone(&self.opened),
        }
    }
}

impl<H> fmt::Debug for MockEngine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEngine")
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

impl<H> MockEngine<H> {
    fn with_outcome(outcome: Outcome<H>) -> Self {
        Self {
            exports: (MIN_DIMENSIONS..=MAX_DIMENSIONS).map(entry_point).collect(),
            outcome: Arc::new(outcome),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every entry point succeeds with `handle`.
    pub fn returning(handle: H) -> Self {
        Self::with_outcome(Outcome::Handle(handle))
    }

    /// Every entry point fails with a freshly built error.
    pub fn failing(error: impl Fn() -> anyhow::Error + Send + Sync + 'static) -> Self {
        Self::with_outcome(Outcome::Fail(Box::new(error)))
    }

    /// Restrict the exported entry points.
    pub fn with_exports(mut self, exports: &[&str]) -> Self {
        self.exports = exports.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Number of entry point calls that reached the engine.
    pub fn calls(&self) -> usize {
        self.log().len()
    }

    /// Entry point names and storages from every call, in order.
    pub fn opened(&self) -> Vec<(String, StorageAdapter)> {
        self.log().clone()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<(String, StorageAdapter)>> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<H: Clone + Send + Sync + 'static> Engine for MockEngine<H> {
    type Handle = H;

    fn exports(&self) -> Vec<String> {
        self.exports.clone()
    }

    async fn open(&self, entry_point: &str, storage: StorageAdapter) -> Result<H> {
        if !self.exports.iter().any(|e| e == entry_point) {
            return Err(EngineInitError::MissingExport(entry_point.to_string()).into());
        }
        self.log().push((entry_point.to_string(), storage));
        match self.outcome.as_ref() {
            Outcome::Handle(handle) => Ok(handle.clone()),
            Outcome::Fail(error) => Err(error()),
        }
    }
}
