//! Remote store wrapper that keeps a local backup of every write.

use async_trait::async_trait;

use crate::cache::{SetCache, SlotStorage};
use crate::error::RemoteResult;

use super::types::CardSet;
use super::RemoteStore;

/// Remote store with a write-through local backup.
///
/// Saves and deletes are mirrored into the backup slot whether or not the
/// remote call succeeds, then the remote result is returned unchanged. Single
/// set reads fall back to the backup when the remote call fails.
pub struct CachedRemote<R: RemoteStore, S: SlotStorage> {
  inner: R,
  backup: SetCache<S>,
}

impl<R: RemoteStore, S: SlotStorage> CachedRemote<R, S> {
  pub fn new(inner: R, backup: SetCache<S>) -> Self {
    Self { inner, backup }
  }

  pub fn inner(&self) -> &R {
    &self.inner
  }

  pub fn backup(&self) -> &SetCache<S> {
    &self.backup
  }
}

#[async_trait]
impl<R: RemoteStore, S: SlotStorage> RemoteStore for CachedRemote<R, S> {
  async fn list_sets(&self) -> RemoteResult<Vec<CardSet>> {
    self.inner.list_sets().await
  }

  async fn get_set(&self, id: &str) -> RemoteResult<Option<CardSet>> {
    match self.inner.get_set(id).await {
      Ok(set) => Ok(set),
      Err(e) => {
        tracing::warn!(set_id = %id, error = %e, "remote get failed, reading local backup");
        Ok(self.backup.get(id))
      }
    }
  }

  async fn save_set(&self, set: &CardSet) -> RemoteResult<()> {
    let result = self.inner.save_set(set).await;
    if let Err(e) = self.backup.upsert(set) {
      tracing::warn!(set_id = %set.id, error = %e, "failed to back up set locally");
    }
    if let Err(e) = &result {
      tracing::error!(set_id = %set.id, error = %e, "remote save failed, kept local backup only");
    }
    result
  }

  async fn delete_set(&self, id: &str) -> RemoteResult<()> {
    let result = self.inner.delete_set(id).await;
    if let Err(e) = self.backup.remove(id) {
      tracing::warn!(set_id = %id, error = %e, "failed to remove set from local backup");
    }
    if let Err(e) = &result {
      tracing::error!(set_id = %id, error = %e, "remote delete failed");
    }
    result
  }
}
