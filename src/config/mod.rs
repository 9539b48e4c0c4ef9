//! Key-value settings storage backed by SQLite.
//!
//! Can share a database with
//! [`SqliteBackend`](crate::storage::sqlite::SqliteBackend) — pass the same
//! path to both.

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, MutexGuard};

use crate::loader::ModuleOptions;

/// Key holding the JSON-encoded [`ModuleOptions`].
pub const MODULE_KEY: &str = "module";
/// Key holding the point arity.
pub const DIMENSIONS_KEY: &str = "dimensions";

/// Persistent key-value settings store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config connection lock poisoned"))
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Get a JSON-encoded value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("config key {key:?} holds invalid JSON"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Store a value as JSON.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }

    pub fn set_module_options(&self, options: &ModuleOptions) -> Result<()> {
        self.set_json(MODULE_KEY, options)
    }

    /// Saved point arity, if any.
    pub fn dimensions(&self) -> Result<Option<usize>> {
        self.get_json(DIMENSIONS_KEY)
    }

    pub fn set_dimensions(&self, dimensions: usize) -> Result<()> {
        self.set_json(DIMENSIONS_KEY, &dimensions)
    }
}
