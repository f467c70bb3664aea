//! In-memory remote store for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::types::CardSet;
use super::RemoteStore;
use crate::error::{RemoteError, RemoteResult};

#[derive(Default)]
struct FakeState {
  sets: Mutex<Vec<CardSet>>,
  fail_reads: AtomicBool,
  fail_writes: AtomicBool,
  delay: Mutex<Option<Duration>>,
  list_calls: AtomicUsize,
}

/// Shared-state fake; clones see the same data.
#[derive(Clone, Default)]
pub struct FakeRemote {
  state: Arc<FakeState>,
}

impl FakeRemote {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_sets(sets: Vec<CardSet>) -> Self {
    let remote = Self::new();
    *remote.state.sets.lock().unwrap() = sets;
    remote
  }

  pub fn fail_reads(&self, fail: bool) {
    self.state.fail_reads.store(fail, Ordering::SeqCst);
  }

  pub fn fail_writes(&self, fail: bool) {
    self.state.fail_writes.store(fail, Ordering::SeqCst);
  }

  /// Make every read sleep this long before answering.
  pub fn set_delay(&self, delay: Option<Duration>) {
    *self.state.delay.lock().unwrap() = delay;
  }

  pub fn list_calls(&self) -> usize {
    self.state.list_calls.load(Ordering::SeqCst)
  }

  async fn read_gate(&self) -> RemoteResult<()> {
    let delay = *self.state.delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.state.fail_reads.load(Ordering::SeqCst) {
      return Err(unavailable());
    }
    Ok(())
  }

  fn write_gate(&self) -> RemoteResult<()> {
    if self.state.fail_writes.load(Ordering::SeqCst) {
      return Err(unavailable());
    }
    Ok(())
  }
}

fn unavailable() -> RemoteError {
  RemoteError::Api {
    status: 503,
    code: None,
    message: "service unavailable".to_string(),
  }
}

#[async_trait]
impl RemoteStore for FakeRemote {
  async fn list_sets(&self) -> RemoteResult<Vec<CardSet>> {
    self.state.list_calls.fetch_add(1, Ordering::SeqCst);
    self.read_gate().await?;
    let mut sets = self.state.sets.lock().unwrap().clone();
    sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(sets)
  }

  async fn get_set(&self, id: &str) -> RemoteResult<Option<CardSet>> {
    self.read_gate().await?;
    let sets = self.state.sets.lock().unwrap();
    Ok(sets.iter().find(|set| set.id == id).cloned())
  }

  async fn save_set(&self, set: &CardSet) -> RemoteResult<()> {
    self.write_gate()?;
    let mut sets = self.state.sets.lock().unwrap();
    match sets.iter_mut().find(|existing| existing.id == set.id) {
      Some(existing) => *existing = set.clone(),
      None => sets.push(set.clone()),
    }
    Ok(())
  }

  async fn delete_set(&self, id: &str) -> RemoteResult<()> {
    self.write_gate()?;
    self.state.sets.lock().unwrap().retain(|set| set.id != id);
    Ok(())
  }
}
