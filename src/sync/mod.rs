//! Online/offline reconciliation.
//!
//! Best effort only: remote data is canonical, the offline cache lets a
//! device keep studying what it has already seen. There is no write queue
//! and no conflict resolution; a save made while offline lands in the local
//! backup and nowhere else.

mod connectivity;
mod orchestrator;

pub use connectivity::{Connectivity, ConnectivityWatcher};
pub use orchestrator::{LibraryState, SyncOptions, SyncOrchestrator, SyncOutcome, SyncSource};
