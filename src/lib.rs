//! Flashcard sets kept in a shared remote store, with a device-local cache
//! so sets already seen stay readable offline.

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod flashcards;
pub mod logging;
pub mod screen;
pub mod study;
pub mod sync;

pub use error::{CacheError, RemoteError, SyncError};
pub use flashcards::{Card, CardSet, RemoteStore, SupabaseClient};
pub use sync::{SyncOptions, SyncOrchestrator};
