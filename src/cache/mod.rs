//! Local cache for offline use.
//!
//! This module provides the device-local persisted copy of card sets:
//! - Raw named slots backed by SQLite (or memory, for tests)
//! - A typed view of one slot holding a JSON array of sets
//! - Silent degradation to an empty list on unreadable data, with a
//!   `cache.corrupt` event so the corruption stays visible in logs

mod set_cache;
mod storage;

pub use set_cache::{SetCache, BACKUP_SLOT, OFFLINE_SLOT};
pub use storage::{MemoryStorage, SlotStorage, SlotValue, SqliteStorage};
