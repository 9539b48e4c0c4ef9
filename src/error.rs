//! Failure taxonomy for initialization.
//!
//! Fallible operations return [`anyhow::Result`]; these types are what ends
//! up inside the [`anyhow::Error`]. Use `downcast_ref` to classify:
//!
//! ```
//! use eyros7d::error::ConfigurationError;
//!
//! let err = anyhow::Error::from(ConfigurationError::MissingStorage);
//! assert!(err.downcast_ref::<ConfigurationError>().is_some());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The caller supplied invalid or incomplete options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("opts.storage not provided")]
    MissingStorage,
    #[error("unsupported dimension count {0} (expected {min}..={max})",
        min = crate::consts::MIN_DIMENSIONS, max = crate::consts::MAX_DIMENSIONS)]
    Dimensions(usize),
}

/// The binary computation module could not be bound.
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    #[error("engine module not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to fetch engine module from {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },
    #[error("invalid engine module: {0}")]
    InvalidModule(String),
    #[error("engine module digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("no engine module bound")]
    NotBound,
}

/// The engine's entry point failed with the adapted storage.
#[derive(Debug, Error)]
pub enum EngineInitError {
    #[error("engine module does not export `{0}`")]
    MissingExport(String),
    #[error("engine failed to open storage: {0}")]
    Open(String),
}
