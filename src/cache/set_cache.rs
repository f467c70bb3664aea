//! Typed view of one cache slot holding a JSON array of sets.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::storage::SlotStorage;
use crate::error::{CacheError, CacheResult};
use crate::flashcards::CardSet;

/// Slot the remote client writes through to on every save and delete.
pub const BACKUP_SLOT: &str = "flashcard-sets";

/// Slot the sync orchestrator mirrors successful remote reads into.
pub const OFFLINE_SLOT: &str = "offline-flashcard-sets";

/// Whole-record get/put/delete of sets kept in a single slot.
///
/// Reads never fail towards the caller: a missing slot is an empty list and a
/// malformed one is reported through a `cache.corrupt` event and then treated
/// as empty. Writes return their errors.
pub struct SetCache<S: SlotStorage> {
  storage: Arc<S>,
  slot: &'static str,
}

impl<S: SlotStorage> SetCache<S> {
  pub fn new(storage: Arc<S>, slot: &'static str) -> Self {
    Self { storage, slot }
  }

  pub fn slot(&self) -> &'static str {
    self.slot
  }

  /// All sets in the slot, or an error if the slot cannot be read or parsed.
  pub fn try_list(&self) -> CacheResult<Vec<CardSet>> {
    let Some(value) = self.storage.read_slot(self.slot)? else {
      return Ok(Vec::new());
    };

    serde_json::from_str(&value.data).map_err(|source| CacheError::Parse {
      slot: self.slot.to_string(),
      source,
    })
  }

  /// All sets in the slot. Empty when absent, unreadable or malformed.
  pub fn list(&self) -> Vec<CardSet> {
    match self.try_list() {
      Ok(sets) => sets,
      Err(CacheError::Parse { slot, source }) => {
        report_corrupt(&slot, &source);
        Vec::new()
      }
      Err(e) => {
        tracing::warn!(target: "flashdeck::cache", slot = self.slot, error = %e, "cache read failed");
        Vec::new()
      }
    }
  }

  /// Current contents for a read-modify-write.
  ///
  /// Malformed data is reported and replaced; any other read failure aborts
  /// the write so the slot is never clobbered with a partial list.
  fn list_for_write(&self) -> CacheResult<Vec<CardSet>> {
    match self.try_list() {
      Err(CacheError::Parse { slot, source }) => {
        report_corrupt(&slot, &source);
        Ok(Vec::new())
      }
      other => other,
    }
  }

  /// When the slot was last written, if ever.
  pub fn written_at(&self) -> Option<DateTime<Utc>> {
    match self.storage.read_slot(self.slot) {
      Ok(value) => value.map(|v| v.written_at),
      Err(e) => {
        tracing::warn!(target: "flashdeck::cache", slot = self.slot, error = %e, "cache read failed");
        None
      }
    }
  }

  pub fn get(&self, id: &str) -> Option<CardSet> {
    self.list().into_iter().find(|set| set.id == id)
  }

  /// Replace the set with the same id, or append it.
  ///
  /// The set is stored exactly as given; timestamps are the caller's job.
  pub fn upsert(&self, set: &CardSet) -> CacheResult<()> {
    let mut sets = self.list_for_write()?;
    match sets.iter_mut().find(|existing| existing.id == set.id) {
      Some(existing) => *existing = set.clone(),
      None => sets.push(set.clone()),
    }
    self.replace_all(&sets)
  }

  pub fn remove(&self, id: &str) -> CacheResult<()> {
    let mut sets = self.list_for_write()?;
    sets.retain(|set| set.id != id);
    self.replace_all(&sets)
  }

  /// Overwrite the slot with exactly `sets`.
  pub fn replace_all(&self, sets: &[CardSet]) -> CacheResult<()> {
    let data = serde_json::to_string(sets).map_err(CacheError::Serialize)?;
    self.storage.write_slot(self.slot, &data)
  }
}

fn report_corrupt(slot: &str, source: &serde_json::Error) {
  tracing::warn!(
    target: "flashdeck::cache",
    event = "cache.corrupt",
    slot = %slot,
    error = %source,
    "cache slot holds malformed data, treating as empty"
  );
}

impl<S: SlotStorage> Clone for SetCache<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      slot: self.slot,
    }
  }
}
