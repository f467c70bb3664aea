//! Orchestrates reads between the remote store and the local cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::connectivity::Connectivity;
use crate::cache::{SetCache, SlotStorage, BACKUP_SLOT, OFFLINE_SLOT};
use crate::error::{SyncError, SyncResult};
use crate::flashcards::{CachedRemote, CardSet, RemoteStore};

/// Timeouts for remote reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
  /// Deadline for the first load
  pub initial_timeout: Duration,
  /// Deadline for refreshes and single-set reads
  pub refresh_timeout: Duration,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      initial_timeout: Duration::from_secs(10),
      refresh_timeout: Duration::from_secs(5),
    }
  }
}

/// Where a load got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
  /// Fresh data from the remote store
  Network,
  /// Flag said offline, served the local copy without trying the network
  Offline,
  /// Remote call failed or timed out, served the local copy
  Fallback,
}

/// Result of a load, including where the data came from.
#[derive(Debug, Clone)]
pub struct SyncOutcome<T> {
  pub data: T,
  pub source: SyncSource,
}

/// What consumers observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryState {
  /// Current set list
  pub sets: Vec<CardSet>,
  /// Operations currently in flight
  pub in_flight: usize,
  /// Source of the most recent completed load
  pub last_source: Option<SyncSource>,
}

impl LibraryState {
  pub fn is_loading(&self) -> bool {
    self.in_flight > 0
  }
}

/// Marks an operation as in flight until dropped.
struct InFlight<'a> {
  state: &'a watch::Sender<LibraryState>,
}

impl<'a> InFlight<'a> {
  fn begin(state: &'a watch::Sender<LibraryState>) -> Self {
    state.send_modify(|s| s.in_flight += 1);
    Self { state }
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self
      .state
      .send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
  }
}

/// Decides per read whether to use the remote store or the local cache.
///
/// When online, remote reads race a deadline; any failure falls back to the
/// offline copy without surfacing an error. Every successful remote list
/// overwrites the offline copy. Overlapping loads are not serialized; the
/// last one to finish sets the current list.
pub struct SyncOrchestrator<R: RemoteStore, S: SlotStorage> {
  remote: CachedRemote<R, S>,
  offline: SetCache<S>,
  connectivity: Connectivity,
  state: watch::Sender<LibraryState>,
  options: SyncOptions,
}

impl<R: RemoteStore, S: SlotStorage> SyncOrchestrator<R, S> {
  pub fn new(remote: R, storage: Arc<S>, connectivity: Connectivity, options: SyncOptions) -> Self {
    let backup = SetCache::new(Arc::clone(&storage), BACKUP_SLOT);
    let (state, _rx) = watch::channel(LibraryState::default());
    Self {
      remote: CachedRemote::new(remote, backup),
      offline: SetCache::new(storage, OFFLINE_SLOT),
      connectivity,
      state,
      options,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
    self.state.subscribe()
  }

  /// Current list, loading flag and last source in one read.
  pub fn snapshot(&self) -> LibraryState {
    self.state.borrow().clone()
  }

  pub fn sets(&self) -> Vec<CardSet> {
    self.state.borrow().sets.clone()
  }

  pub fn is_loading(&self) -> bool {
    self.state.borrow().is_loading()
  }

  pub fn is_online(&self) -> bool {
    self.connectivity.is_online()
  }

  pub fn offline_cache(&self) -> &SetCache<S> {
    &self.offline
  }

  pub fn backup_cache(&self) -> &SetCache<S> {
    self.remote.backup()
  }

  /// First load, with the longer deadline.
  pub async fn load(&self) -> SyncOutcome<Vec<CardSet>> {
    self.sync_sets(self.options.initial_timeout).await
  }

  /// On-demand reload, with the shorter deadline.
  pub async fn refresh(&self) -> SyncOutcome<Vec<CardSet>> {
    self.sync_sets(self.options.refresh_timeout).await
  }

  async fn sync_sets(&self, deadline: Duration) -> SyncOutcome<Vec<CardSet>> {
    let _in_flight = InFlight::begin(&self.state);

    let outcome = if self.connectivity.is_online() {
      match tokio::time::timeout(deadline, self.remote.list_sets()).await {
        Ok(Ok(sets)) => {
          if let Err(e) = self.offline.replace_all(&sets) {
            tracing::warn!(error = %e, "failed to mirror sets into offline cache");
          }
          tracing::info!(count = sets.len(), "loaded sets from remote");
          SyncOutcome {
            data: sets,
            source: SyncSource::Network,
          }
        }
        Ok(Err(e)) => {
          tracing::warn!(error = %e, "remote load failed, falling back to offline cache");
          self.from_offline(SyncSource::Fallback)
        }
        Err(_) => {
          let e = SyncError::Timeout(deadline);
          tracing::warn!(error = %e, "remote load timed out, falling back to offline cache");
          self.from_offline(SyncSource::Fallback)
        }
      }
    } else {
      tracing::info!("offline, loading sets from offline cache");
      self.from_offline(SyncSource::Offline)
    };

    self.state.send_modify(|state| {
      state.sets = outcome.data.clone();
      state.last_source = Some(outcome.source);
    });
    outcome
  }

  fn from_offline(&self, source: SyncSource) -> SyncOutcome<Vec<CardSet>> {
    let sets = self.offline.list();
    tracing::debug!(count = sets.len(), ?source, "served sets from offline cache");
    SyncOutcome { data: sets, source }
  }

  /// One set by id. Never fails; falls back to local copies.
  ///
  /// Errors and timeouts are treated alike: the offline mirror is tried
  /// first, then the write-through backup.
  pub async fn get_set(&self, id: &str) -> Option<CardSet> {
    let _in_flight = InFlight::begin(&self.state);

    if self.connectivity.is_online() {
      let read = self.remote.inner().get_set(id);
      match tokio::time::timeout(self.options.refresh_timeout, read).await {
        Ok(Ok(set)) => return set,
        Ok(Err(e)) => tracing::warn!(set_id = %id, error = %e, "remote get failed"),
        Err(_) => tracing::warn!(set_id = %id, "remote get timed out"),
      }
    }

    self
      .offline
      .get(id)
      .or_else(|| self.remote.backup().get(id))
  }

  /// Stamp, validate and save a set.
  ///
  /// `updated_at` is stamped here and nowhere else. The local backup is
  /// written even when the remote save fails; the error is still returned.
  pub async fn save_set(&self, mut set: CardSet) -> SyncResult<CardSet> {
    let previous = self
      .state
      .borrow()
      .sets
      .iter()
      .find(|s| s.id == set.id)
      .map(|s| s.updated_at);
    if let Some(previous) = previous {
      set.updated_at = set.updated_at.max(previous);
    }
    set.touch();
    set.validate()?;

    let _in_flight = InFlight::begin(&self.state);
    self.remote.save_set(&set).await?;

    if let Err(e) = self.offline.upsert(&set) {
      tracing::warn!(set_id = %set.id, error = %e, "failed to update offline cache");
    }
    self.state.send_modify(|state| {
      match state.sets.iter_mut().find(|s| s.id == set.id) {
        Some(existing) => *existing = set.clone(),
        None => state.sets.insert(0, set.clone()),
      }
    });
    Ok(set)
  }

  /// Delete a set and its cards.
  pub async fn delete_set(&self, id: &str) -> SyncResult<()> {
    let _in_flight = InFlight::begin(&self.state);
    self.remote.delete_set(id).await?;

    if let Err(e) = self.offline.remove(id) {
      tracing::warn!(set_id = %id, error = %e, "failed to update offline cache");
    }
    self
      .state
      .send_modify(|state| state.sets.retain(|s| s.id != id));
    Ok(())
  }
}
