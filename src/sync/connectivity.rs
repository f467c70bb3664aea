//! Process-wide online/offline flag.
//!
//! `ConnectivityWatcher` owns the only writer. Everyone else holds a
//! `Connectivity` handle and either reads the current value or subscribes to
//! transitions; dropping the receiver unsubscribes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Read side of the connectivity flag.
#[derive(Clone, Debug)]
pub struct Connectivity {
  rx: watch::Receiver<bool>,
}

impl Connectivity {
  pub fn is_online(&self) -> bool {
    *self.rx.borrow()
  }

  /// Receiver that wakes on every transition.
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.rx.clone()
  }
}

/// Write side of the connectivity flag.
pub struct ConnectivityWatcher {
  tx: watch::Sender<bool>,
}

impl ConnectivityWatcher {
  pub fn new(initially_online: bool) -> Self {
    let (tx, _rx) = watch::channel(initially_online);
    Self { tx }
  }

  pub fn handle(&self) -> Connectivity {
    Connectivity {
      rx: self.tx.subscribe(),
    }
  }

  /// Record the current state. Subscribers are only woken on a change.
  pub fn set_online(&self, online: bool) {
    let changed = self.tx.send_if_modified(|current| {
      if *current == online {
        false
      } else {
        *current = online;
        true
      }
    });
    if changed {
      tracing::info!(online, "connectivity changed");
    }
  }

  /// Poll `check` every `interval` and record its answer.
  ///
  /// The task stops once every `Connectivity` handle has been dropped.
  pub fn spawn_heartbeat<P, Fut>(self, interval: Duration, check: P) -> JoinHandle<()>
  where
    P: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        if self.tx.is_closed() {
          break;
        }
        let online = check().await;
        self.set_online(online);
      }
    })
  }
}
