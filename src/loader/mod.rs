//! Getting the compiled engine module into an [`Api`](crate::engine::Api).
//!
//! A [`ModuleLoader`] turns [`ModuleOptions`] into a bound-ready module.
//! [`BytesLoader`] covers the common case: locate the WebAssembly bytes
//! (inline, base64, file, URL, or the default artifact path), check them,
//! and hand them to a runtime-specific [`Instantiate`].

pub mod bytes;
pub mod mock;

pub use bytes::{BytesLoader, Instantiate};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::consts::{WASM_MAGIC, default_module_path_in, home_dir};
use crate::engine::Engine;
use crate::error::ModuleLoadError;

/// Where the engine binary comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModuleSource {
    Bytes(Vec<u8>),
    Base64(String),
    Path(PathBuf),
    Url(String),
}

/// Loader-specific part of the initialization options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOptions {
    /// `None` means the default artifact path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ModuleSource>,
    /// Expected SHA-256 of the binary, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ModuleOptions {
    pub fn from_source(source: ModuleSource) -> Self {
        Self {
            source: Some(source),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    /// Options saved under the `module` key, or defaults if none are saved.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(config
            .get_json(crate::config::MODULE_KEY)?
            .unwrap_or_default())
    }
}

/// Binds a computation module. May fail if the artifact is missing or
/// unusable on this platform.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    type Module: Engine;

    async fn load(&self, options: &ModuleOptions) -> Result<Self::Module>;
}

/// Lets callers keep a handle on a loader that an initializer owns.
#[async_trait]
impl<L: ModuleLoader> ModuleLoader for std::sync::Arc<L> {
    type Module = L::Module;

    async fn load(&self, options: &ModuleOptions) -> Result<L::Module> {
        self.as_ref().load(options).await
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Locate, decode, and check the module bytes described by `options`.
/// Without a source, reads the default artifact under the user's home.
pub async fn resolve_bytes(options: &ModuleOptions) -> Result<Vec<u8>> {
    resolve_bytes_in(options, &home_dir()).await
}

/// Like [`resolve_bytes`], with the default artifact looked up under `home`.
pub async fn resolve_bytes_in(options: &ModuleOptions, home: &Path) -> Result<Vec<u8>> {
    let bytes = match &options.source {
        Some(ModuleSource::Bytes(bytes)) => bytes.clone(),
        Some(ModuleSource::Base64(encoded)) => STANDARD
            .decode(encoded.trim())
            .map_err(|e| ModuleLoadError::InvalidModule(format!("bad base64: {e}")))?,
        Some(ModuleSource::Path(path)) => read_file(path).await?,
        Some(ModuleSource::Url(url)) => fetch(url).await?,
        None => read_file(&default_module_path_in(home)).await?,
    };

    if !bytes.starts_with(WASM_MAGIC) {
        return Err(ModuleLoadError::InvalidModule("missing WebAssembly header".into()).into());
    }

    if let Some(expected) = &options.sha256 {
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ModuleLoadError::DigestMismatch {
                expected: expected.clone(),
                actual,
            }
            .into());
        }
    }

    debug!(size = bytes.len(), "resolved engine module");
    Ok(bytes)
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ModuleLoadError::NotFound(path.to_path_buf()).into())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

async fn fetch(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to request {url}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ModuleLoadError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read body from {url}"))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &[u8] = b"\0asm\x01\0\0\0";

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn inline_bytes_pass_through() {
        let options = ModuleOptions::from_source(ModuleSource::Bytes(MODULE.to_vec()));
        assert_eq!(resolve_bytes(&options).await.unwrap(), MODULE);
    }

    #[tokio::test]
    async fn base64_is_decoded() {
        let options = ModuleOptions::from_source(ModuleSource::Base64(STANDARD.encode(MODULE)));
        assert_eq!(resolve_bytes(&options).await.unwrap(), MODULE);
    }

    #[tokio::test]
    async fn bad_base64_is_invalid_module() {
        let options = ModuleOptions::from_source(ModuleSource::Base64("!!!".into()));
        let err = resolve_bytes(&options).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModuleLoadError>(),
            Some(ModuleLoadError::InvalidModule(_))
        ));
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let options = ModuleOptions::from_source(ModuleSource::Bytes(b"MZ\x90\0".to_vec()));
        let err = resolve_bytes(&options).await.unwrap_err();
        assert!(err.to_string().contains("WebAssembly header"));
    }

    #[tokio::test]
    async fn digest_is_checked() {
        let good = ModuleOptions::from_source(ModuleSource::Bytes(MODULE.to_vec()))
            .with_sha256(sha256_hex(MODULE).to_uppercase());
        assert!(resolve_bytes(&good).await.is_ok());

        let bad = ModuleOptions::from_source(ModuleSource::Bytes(MODULE.to_vec()))
            .with_sha256("00".repeat(32));
        let err = resolve_bytes(&bad).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModuleLoadError>(),
            Some(ModuleLoadError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn options_serialize_as_tagged_json() {
        let options = ModuleOptions::from_source(ModuleSource::Url("http://x/e.wasm".into()));
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"source":{"type":"url","value":"http://x/e.wasm"}}"#);
        let back: ModuleOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
