use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{Backend, BackendFile, Stat};

/// One regular file per name under a root directory.
///
/// Names may contain `/` to create subdirectories, but must stay inside
/// the root: absolute paths and `..` are rejected.
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !inside {
            bail!("invalid storage name: {name:?}");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Backend for DiskBackend {
    async fn file(&self, name: &str) -> Result<Box<dyn BackendFile>> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Box::new(DiskFile {
            path,
            file: Mutex::new(file),
        }))
    }
}

struct DiskFile {
    path: PathBuf,
    file: Mutex<File>,
}

#[async_trait]
impl BackendFile for DiskFile {
    async fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mut file = self.file.lock().await;
        let len = file.metadata().await?.len();
        let end = offset.checked_add(size).unwrap_or(u64::MAX);
        if end > len {
            bail!(
                "read out of bounds: {}..{} of {} bytes in {}",
                offset,
                end,
                len,
                self.path.display()
            );
        }
        let mut buf = vec![0; size as usize];
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn del(&self, offset: u64, size: u64) -> Result<()> {
        let mut file = self.file.lock().await;
        let len = file.metadata().await?.len();
        if offset >= len {
            return Ok(());
        }
        let end = offset.saturating_add(size).min(len);
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(&vec![0; (end - offset) as usize]).await?;
        file.flush().await?;
        Ok(())
    }

    async fn truncate(&self, size: u64) -> Result<()> {
        self.file.lock().await.set_len(size).await?;
        Ok(())
    }

    async fn stat(&self) -> Result<Stat> {
        let meta = self.file.lock().await.metadata().await?;
        Ok(Stat { size: meta.len() })
    }

    async fn close(&self) -> Result<()> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_all()
            .await
            .with_context(|| format!("failed to sync {}", self.path.display()))?;
        Ok(())
    }
}
