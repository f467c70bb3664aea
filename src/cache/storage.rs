//! Slot storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CacheError, CacheResult};

/// Raw contents of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotValue {
  /// Serialized payload as written
  pub data: String,
  /// When the slot was last written
  pub written_at: DateTime<Utc>,
}

/// Trait for slot storage backends.
///
/// A slot is a named string value that is read and replaced as a whole.
pub trait SlotStorage: Send + Sync {
  /// Read a slot, `None` if it was never written.
  fn read_slot(&self, slot: &str) -> CacheResult<Option<SlotValue>>;

  /// Replace the contents of a slot.
  fn write_slot(&self, slot: &str, data: &str) -> CacheResult<()>;
}

/// In-memory storage. Used in tests and when the on-disk cache is disabled.
#[derive(Default)]
pub struct MemoryStorage {
  slots: Mutex<HashMap<String, SlotValue>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SlotStorage for MemoryStorage {
  fn read_slot(&self, slot: &str) -> CacheResult<Option<SlotValue>> {
    let slots = self.slots.lock().map_err(|_| CacheError::LockPoisoned)?;
    Ok(slots.get(slot).cloned())
  }

  fn write_slot(&self, slot: &str, data: &str) -> CacheResult<()> {
    let mut slots = self.slots.lock().map_err(|_| CacheError::LockPoisoned)?;
    slots.insert(
      slot.to_string(),
      SlotValue {
        data: data.to_string(),
        written_at: Utc::now(),
      },
    );
    Ok(())
  }
}

/// SQLite-based slot storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the cache at the default location.
  pub fn open() -> CacheResult<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the cache database at `path`.
  pub fn open_at(path: &Path) -> CacheResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    tracing::debug!(path = %path.display(), "opened cache database");
    Self::from_connection(conn)
  }

  /// Open a throwaway in-memory database.
  pub fn open_in_memory() -> CacheResult<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> CacheResult<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> CacheResult<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| {
        CacheError::Io(std::io::Error::new(
          std::io::ErrorKind::NotFound,
          "could not determine data directory",
        ))
      })?;

    Ok(data_dir.join("flashdeck").join("cache.db"))
  }

  fn run_migrations(&self) -> CacheResult<()> {
    let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(())
  }
}

/// Schema for the slot table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS slots (
    slot TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    written_at TEXT NOT NULL
);
"#;

impl SlotStorage for SqliteStorage {
  fn read_slot(&self, slot: &str) -> CacheResult<Option<SlotValue>> {
    let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT data, written_at FROM slots WHERE slot = ?",
        params![slot],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    Ok(row.map(|(data, written_at)| SlotValue {
      data,
      // A bad timestamp only loses metadata, the payload is still usable
      written_at: DateTime::parse_from_rfc3339(&written_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default(),
    }))
  }

  fn write_slot(&self, slot: &str, data: &str) -> CacheResult<()> {
    let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
    conn.execute(
      "INSERT OR REPLACE INTO slots (slot, data, written_at) VALUES (?, ?, ?)",
      params![slot, data, Utc::now().to_rfc3339()],
    )?;
    Ok(())
  }
}

impl<T: SlotStorage + ?Sized> SlotStorage for std::sync::Arc<T> {
  fn read_slot(&self, slot: &str) -> CacheResult<Option<SlotValue>> {
    (**self).read_slot(slot)
  }

  fn write_slot(&self, slot: &str, data: &str) -> CacheResult<()> {
    (**self).write_slot(slot, data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn exercise(storage: &dyn SlotStorage) {
    assert!(storage.read_slot("a").unwrap().is_none());

    storage.write_slot("a", "[1]").unwrap();
    storage.write_slot("b", "[2]").unwrap();
    assert_eq!(storage.read_slot("a").unwrap().unwrap().data, "[1]");

    storage.write_slot("a", "[3]").unwrap();
    assert_eq!(storage.read_slot("a").unwrap().unwrap().data, "[3]");
    assert_eq!(storage.read_slot("b").unwrap().unwrap().data, "[2]");
  }

  #[test]
  fn test_memory_storage() {
    exercise(&MemoryStorage::new());
  }

  #[test]
  fn test_sqlite_in_memory() {
    exercise(&SqliteStorage::open_in_memory().unwrap());
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.write_slot("flashcard-sets", "[]").unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    let value = storage.read_slot("flashcard-sets").unwrap().unwrap();
    assert_eq!(value.data, "[]");
    assert!(value.written_at.timestamp() > 0);
  }
}
