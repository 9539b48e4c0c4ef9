//! Project-wide constants.

use std::path::{Path, PathBuf};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Number of dimensions when none is specified (the `7d` layout).
pub const DEFAULT_DIMENSIONS: usize = 7;

/// Smallest and largest point arity the engine exports an entry point for.
pub const MIN_DIMENSIONS: usize = 2;
pub const MAX_DIMENSIONS: usize = 8;

/// Magic bytes every WebAssembly binary starts with.
pub const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Name of the engine entry point for a mixed-coordinate `f32` database
/// of the given arity, e.g. `open_mix_f32_f32` for 2 dimensions.
pub fn entry_point(dimensions: usize) -> String {
    let coords = vec!["f32"; dimensions].join("_");
    format!("open_mix_{coords}")
}

/// The user's home directory, or the working directory when there is none.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Directory holding the engine artifact and settings: `~/.eyros`.
pub fn data_dir() -> PathBuf {
    data_dir_in(&home_dir())
}

pub fn data_dir_in(home: &Path) -> PathBuf {
    home.join(".eyros")
}

/// Default location of the compiled engine module: `~/.eyros/eyros7d.wasm`.
pub fn default_module_path() -> PathBuf {
    default_module_path_in(&home_dir())
}

/// Where the engine module lives for a given home directory.
pub fn default_module_path_in(home: &Path) -> PathBuf {
    data_dir_in(home).join("eyros7d.wasm")
}

/// Default settings database: `~/.eyros/eyros.db`.
pub fn default_db_path() -> PathBuf {
    data_dir().join("eyros.db")
}
