use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ModuleLoader, ModuleOptions};
use crate::engine::Engine;

type ErrorFactory = Box<dyn Fn() -> anyhow::Error + Send + Sync>;

/// A scripted loader for tests. Hands out clones of one module for the
/// first `successes` calls, then fails, and remembers what it was asked
/// to load.
pub struct MockLoader<M> {
    module: Option<M>,
    successes: usize,
    error: Option<ErrorFactory>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ModuleOptions>>,
}

impl<M> MockLoader<M> {
    /// Every call succeeds with a clone of `module`.
    pub fn new(module: M) -> Self {
        Self {
            module: Some(module),
            successes: usize::MAX,
            error: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails.
    pub fn failing(error: impl Fn() -> anyhow::Error + Send + Sync + 'static) -> Self {
        Self {
            module: None,
            successes: 0,
            error: Some(Box::new(error)),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Succeed `successes` times, then fail on every later call.
    pub fn failing_after(
        mut self,
        successes: usize,
        error: impl Fn() -> anyhow::Error + Send + Sync + 'static,
    ) -> Self {
        self.successes = successes;
        self.error = Some(Box::new(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Options passed to every `load` call, in order.
    pub fn seen(&self) -> Vec<ModuleOptions> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl<M: Engine + Clone> ModuleLoader for MockLoader<M> {
    type Module = M;

    async fn load(&self, options: &ModuleOptions) -> Result<M> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(options.clone());
        match (&self.module, &self.error) {
            (Some(module), _) if i < self.successes => Ok(module.clone()),
            (_, Some(error)) => Err(error()),
            _ => Err(anyhow!("MockLoader: nothing to load (call {})", i + 1)),
        }
    }
}
