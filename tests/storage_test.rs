use std::sync::Arc;

use eyros7d::engine::Storage;
use eyros7d::storage::disk::DiskBackend;
use eyros7d::storage::memory::MemoryBackend;
use eyros7d::storage::sqlite::SqliteBackend;
use eyros7d::storage::{Backend, Stat, StorageAdapter};

/// Behavior every bundled backend must share.
async fn check_backend(backend: Arc<dyn Backend>) {
    let file = backend.file("tree/0").await.unwrap();
    assert_eq!(file.stat().await.unwrap(), Stat { size: 0 });

    file.write(0, b"hello").await.unwrap();
    assert_eq!(file.read(1, 3).await.unwrap(), b"ell");

    // Writing past the end zero-fills the gap.
    file.write(8, b"xy").await.unwrap();
    assert_eq!(file.stat().await.unwrap().size, 10);
    assert_eq!(file.read(5, 3).await.unwrap(), vec![0, 0, 0]);

    // Reads past the end fail.
    assert!(file.read(8, 3).await.is_err());

    file.del(1, 2).await.unwrap();
    assert_eq!(file.read(0, 5).await.unwrap(), b"h\0\0lo");

    // Deleting beyond the end neither fails nor grows the file.
    file.del(9, 100).await.unwrap();
    assert_eq!(file.stat().await.unwrap().size, 10);

    file.truncate(4).await.unwrap();
    assert_eq!(file.stat().await.unwrap().size, 4);
    file.truncate(6).await.unwrap();
    assert_eq!(file.read(0, 6).await.unwrap(), b"h\0\0l\0\0");

    file.close().await.unwrap();

    // A second handle under the same name sees the same bytes.
    let again = backend.file("tree/0").await.unwrap();
    assert_eq!(again.read(0, 1).await.unwrap(), b"h");

    // Names are independent.
    let other = backend.file("meta").await.unwrap();
    assert_eq!(other.stat().await.unwrap().size, 0);
}

/// The same sequence seen through the engine-facing adapter.
async fn check_adapter(backend: Arc<dyn Backend>) {
    let adapter = StorageAdapter::wrap(backend);
    let mut file = adapter.open("data").await.unwrap();

    assert!(file.is_empty().await.unwrap());
    file.write(0, &[1, 2, 3, 4]).await.unwrap();
    assert_eq!(file.len().await.unwrap(), 4);
    assert_eq!(file.read(2, 2).await.unwrap(), vec![3, 4]);
    file.del(0, 2).await.unwrap();
    assert_eq!(file.read(0, 4).await.unwrap(), vec![0, 0, 3, 4]);
    file.truncate(1).await.unwrap();
    assert_eq!(file.len().await.unwrap(), 1);
    file.sync_all().await.unwrap();
}

/// Offsets and sizes beyond what a byte vector can hold fail cleanly and
/// leave the file untouched.
async fn check_huge_offsets(backend: Arc<dyn Backend>) {
    let file = backend.file("x").await.unwrap();
    file.write(0, b"ok").await.unwrap();

    assert!(file.write(u64::MAX - 1, b"ab").await.is_err());
    assert!(file.write(u64::MAX, b"a").await.is_err());
    assert!(file.truncate(u64::MAX).await.is_err());

    assert_eq!(file.stat().await.unwrap().size, 2);
    assert_eq!(file.read(0, 2).await.unwrap(), b"ok");
}

#[tokio::test]
async fn memory_backend() {
    check_backend(Arc::new(MemoryBackend::new())).await;
    check_adapter(Arc::new(MemoryBackend::new())).await;
}

#[tokio::test]
async fn memory_backend_rejects_huge_offsets() {
    check_huge_offsets(Arc::new(MemoryBackend::new())).await;
}

#[tokio::test]
async fn memory_backend_lists_names() {
    let backend = MemoryBackend::new();
    backend.file("b").await.unwrap();
    backend.file("a").await.unwrap();
    assert_eq!(backend.names().await, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn disk_backend() {
    let dir = tempfile::tempdir().unwrap();
    check_backend(Arc::new(DiskBackend::new(dir.path().join("db")))).await;
    check_adapter(Arc::new(DiskBackend::new(dir.path().join("adapter")))).await;
    assert!(dir.path().join("db").join("tree").join("0").is_file());
}

#[tokio::test]
async fn disk_backend_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let backend = DiskBackend::new(dir.path());
        let file = backend.file("meta").await.unwrap();
        file.write(0, b"persisted").await.unwrap();
        file.close().await.unwrap();
    }
    let backend = DiskBackend::new(dir.path());
    let file = backend.file("meta").await.unwrap();
    assert_eq!(file.read(0, 9).await.unwrap(), b"persisted");
}

#[tokio::test]
async fn disk_backend_rejects_escaping_names() {
    let dir = tempfile::tempdir().unwrap();
    let backend = DiskBackend::new(dir.path());
    assert!(backend.file("../outside").await.is_err());
}

#[tokio::test]
async fn sqlite_backend() {
    check_backend(Arc::new(SqliteBackend::in_memory().unwrap())).await;
    check_adapter(Arc::new(SqliteBackend::in_memory().unwrap())).await;
}

#[tokio::test]
async fn sqlite_backend_rejects_huge_offsets() {
    check_huge_offsets(Arc::new(SqliteBackend::in_memory().unwrap())).await;
}

#[tokio::test]
async fn sqlite_backend_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eyros.db");
    let path_str = path.to_str().unwrap();

    {
        let backend = SqliteBackend::new(path_str).unwrap();
        let file = backend.file("tree/3").await.unwrap();
        file.write(0, b"blob").await.unwrap();
    }

    let backend = SqliteBackend::new(path_str).unwrap();
    assert_eq!(backend.names().unwrap(), vec!["tree/3".to_string()]);
    let file = backend.file("tree/3").await.unwrap();
    assert_eq!(file.read(0, 4).await.unwrap(), b"blob");
}
