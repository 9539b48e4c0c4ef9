//! The one-shot initialization path: validate options, bind the engine
//! module, wrap the caller's storage, and open the engine on it.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::consts::{DEFAULT_DIMENSIONS, MAX_DIMENSIONS, MIN_DIMENSIONS, entry_point};
use crate::engine::{Api, Engine};
use crate::error::ConfigurationError;
use crate::events::{Event, EventBus};
use crate::loader::{ModuleLoader, ModuleOptions};
use crate::storage::{Backend, StorageAdapter};

/// Handle type produced by loader `L`'s engine.
pub type HandleOf<L> = <<L as ModuleLoader>::Module as Engine>::Handle;

/// What the caller passes to [`Initializer::configure`].
#[derive(Clone)]
pub struct Options {
    /// Required. Left as `None` only to represent a caller that forgot it.
    pub storage: Option<Arc<dyn Backend>>,
    pub module: ModuleOptions,
    /// Point arity; selects the entry point.
    pub dimensions: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            storage: None,
            module: ModuleOptions::default(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("storage", &self.storage.as_ref().map(|_| ".."))
            .field("module", &self.module)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl Options {
    pub fn new(storage: Arc<dyn Backend>) -> Self {
        Self {
            storage: Some(storage),
            ..Self::default()
        }
    }

    pub fn with_module(mut self, module: ModuleOptions) -> Self {
        self.module = module;
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Module options and arity from saved settings, defaults for whatever
    /// is unset.
    pub fn from_config(config: &Config, storage: Option<Arc<dyn Backend>>) -> Result<Self> {
        Ok(Self {
            storage,
            module: ModuleOptions::from_config(config)?,
            dimensions: config.dimensions()?.unwrap_or(DEFAULT_DIMENSIONS),
        })
    }

    fn validate(&self) -> Result<Arc<dyn Backend>, ConfigurationError> {
        let storage = self
            .storage
            .clone()
            .ok_or(ConfigurationError::MissingStorage)?;
        if !(MIN_DIMENSIONS..=MAX_DIMENSIONS).contains(&self.dimensions) {
            return Err(ConfigurationError::Dimensions(self.dimensions));
        }
        Ok(storage)
    }
}

/// Binds engine modules from a loader and opens them on caller storage.
///
/// Owns its [`Api`], so separate initializers never share a binding.
/// Calls to [`configure`](Self::configure) on one initializer run one at a
/// time; a call always opens the module it bound itself.
pub struct Initializer<L: ModuleLoader> {
    loader: L,
    api: Api<L::Module>,
    events: Arc<EventBus>,
    serial: Mutex<()>,
}

impl<L: ModuleLoader> Initializer<L> {
    pub fn new(loader: L) -> Self {
        Self::with_events(loader, Arc::new(EventBus::default()))
    }

    pub fn with_events(loader: L, events: Arc<EventBus>) -> Self {
        Self {
            loader,
            api: Api::new(),
            events,
            serial: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &Api<L::Module> {
        &self.api
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Validate `options`, bind the module, wrap the storage, and return
    /// whatever the engine's entry point returns.
    ///
    /// Nothing happens if validation fails. Loader and engine errors come
    /// back exactly as raised.
    pub async fn configure(&self, options: Options) -> Result<HandleOf<L>> {
        let storage = options.validate()?;
        let entry_point = entry_point(options.dimensions);

        let _serial = self.serial.lock().await;

        let module = self.loader.load(&options.module).await?;
        let exports = module.exports();
        let replaced = self.api.bind(module).await.is_some();
        debug!(?exports, replaced, "bound engine module");
        self.events.emit(Event::ModuleBound { exports, replaced });

        let adapter = StorageAdapter::wrap(storage);
        self.events.emit(Event::StorageWrapped);

        let handle = self.api.open(&entry_point, adapter).await?;
        info!(%entry_point, "engine opened");
        self.events.emit(Event::EngineOpened { entry_point });

        Ok(handle)
    }
}

/// One-shot form of [`Initializer::configure`].
pub async fn configure<L: ModuleLoader>(loader: L, options: Options) -> Result<HandleOf<L>> {
    Initializer::new(loader).configure(options).await
}
