use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Backend, BackendFile, Stat, read_range, resize, write_at, zero_range};

/// SQLite-backed persistent storage. Each file is one BLOB row.
///
/// Queries run on the calling task while holding a blocking mutex, so
/// every call blocks its executor thread for the duration of the I/O.
/// Fine for small files and tests; wrap in `spawn_blocking` for heavy use.
///
/// Can share a database with [`Config`](crate::config::Config); pass the
/// same path to both.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                name TEXT PRIMARY KEY,
                data BLOB NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    /// Names of every stored file, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT name FROM blobs ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("sqlite connection lock poisoned"))
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn file(&self, name: &str) -> Result<Box<dyn BackendFile>> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO blobs (name, data) VALUES (?1, x'')",
            [name],
        )?;
        Ok(Box::new(SqliteFile {
            conn: Arc::clone(&self.conn),
            name: name.to_string(),
        }))
    }
}

struct SqliteFile {
    conn: Arc<Mutex<Connection>>,
    name: String,
}

impl SqliteFile {
    fn load(&self, conn: &Connection) -> Result<Vec<u8>> {
        let data = conn
            .query_row(
                "SELECT data FROM blobs WHERE name = ?1",
                [&self.name],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data.unwrap_or_default())
    }

    fn store(&self, conn: &Connection, data: &[u8]) -> Result<()> {
        conn.execute(
            "INSERT INTO blobs (name, data) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data",
            rusqlite::params![self.name, data],
        )?;
        Ok(())
    }

    /// Read-modify-write under a single lock.
    fn update(&self, f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<()> {
        let conn = lock(&self.conn)?;
        let mut data = self.load(&conn)?;
        f(&mut data)?;
        self.store(&conn, &data)
    }
}

#[async_trait]
impl BackendFile for SqliteFile {
    async fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let conn = lock(&self.conn)?;
        read_range(&self.load(&conn)?, offset, size)
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.update(|buf| write_at(buf, offset, data))
    }

    async fn del(&self, offset: u64, size: u64) -> Result<()> {
        self.update(|buf| {
            zero_range(buf, offset, size);
            Ok(())
        })
    }

    async fn truncate(&self, size: u64) -> Result<()> {
        self.update(|buf| resize(buf, size))
    }

    async fn stat(&self) -> Result<Stat> {
        let conn = lock(&self.conn)?;
        let size: i64 = conn.query_row(
            "SELECT length(data) FROM blobs WHERE name = ?1",
            [&self.name],
            |row| row.get(0),
        )?;
        Ok(Stat { size: size as u64 })
    }
}
