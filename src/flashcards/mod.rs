//! Card sets, their wire format, and the remote store.

pub mod api_types;
mod cached_client;
mod client;
pub mod editor;
pub mod import;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use async_trait::async_trait;

use crate::error::RemoteResult;

pub use cached_client::CachedRemote;
pub use client::SupabaseClient;
pub use editor::{DraftError, SetDraft};
pub use import::parse_speed_quiz;
pub use types::{
  new_id, now_millis, Card, CardSet, ImageRef, SetValidationError, IMAGE_SIZE_GUIDANCE,
};

/// CRUD over sets and the cards that belong to them.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// All sets, newest first, each with its cards in creation order.
  async fn list_sets(&self) -> RemoteResult<Vec<CardSet>>;

  /// One set with its cards. `Ok(None)` when the id does not exist.
  async fn get_set(&self, id: &str) -> RemoteResult<Option<CardSet>>;

  /// Upsert the set and replace its cards.
  ///
  /// Not atomic: the set row and card rows are written by separate requests.
  async fn save_set(&self, set: &CardSet) -> RemoteResult<()>;

  /// Delete the set's cards, then the set.
  async fn delete_set(&self, id: &str) -> RemoteResult<()>;
}
