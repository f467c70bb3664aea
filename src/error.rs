//! Error types for the storage and sync layers

use std::time::Duration;

use thiserror::Error;

use crate::flashcards::SetValidationError;

/// Failure of any remote store operation
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("Invalid remote configuration: {0}")]
  InvalidConfiguration(String),
  #[error("Remote request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("Remote API error {status}: {message}")]
  Api {
    status: u16,
    code: Option<String>,
    message: String,
  },
  #[error("Invalid remote payload: {0}")]
  Decode(String),
}

/// Failure of the local cache
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("Cache storage error: {0}")]
  Storage(#[from] rusqlite::Error),
  #[error("Cache slot {slot} holds malformed data: {source}")]
  Parse {
    slot: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("Failed to serialize cache slot: {0}")]
  Serialize(#[source] serde_json::Error),
  #[error("Cache lock poisoned")]
  LockPoisoned,
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors surfaced by the sync orchestrator's write paths
#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Remote(#[from] RemoteError),
  #[error("Remote call timed out after {0:?}")]
  Timeout(Duration),
  #[error("Invalid set: {0}")]
  Invalid(#[from] SetValidationError),
  #[error(transparent)]
  Cache(#[from] CacheError),
}

pub type RemoteResult<T> = Result<T, RemoteError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type SyncResult<T> = Result<T, SyncError>;
