use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
  time::Duration,
};

use derive_deref::{Deref, DerefMut};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;
use tracing::debug;

use super::ongoing::{OngoingOperations, SharedResult};
use crate::{error::Error, remote::SiteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum SyncKind {
  Preferences,
}

/// Non-fatal problems found while syncing, one message per item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
pub struct Warnings(pub Vec<String>);

type SyncKey = (SyncKind, SiteId);

/// Runs at most one sync per kind and site, and remembers when each last
/// finished successfully.
pub struct SyncCoordinator {
  ongoing: OngoingOperations<SyncKey, Warnings>,
  sync_times: Mutex<HashMap<SyncKey, Instant>>,
  sync_interval: Duration,
}

impl SyncCoordinator {
  pub fn new(sync_interval: Duration) -> Self {
    SyncCoordinator { ongoing: OngoingOperations::new(), sync_times: Mutex::new(HashMap::new()), sync_interval }
  }

  pub fn sync_interval(&self) -> Duration {
    self.sync_interval
  }

  pub fn is_syncing(&self, kind: SyncKind, site: &str) -> bool {
    self.ongoing.contains(&(kind, site.to_string()))
  }

  pub fn ongoing_sync(&self, kind: SyncKind, site: &str) -> Option<SharedResult<Warnings>> {
    self.ongoing.get(&(kind, site.to_string()))
  }

  /// Returns the sync already running for `kind` on `site`, or starts the one
  /// built by `start`. Every caller observes the same warnings or the same error.
  pub fn sync<F>(&self, kind: SyncKind, site: &str, start: F) -> SharedResult<Warnings>
  where
    F: FnOnce() -> BoxFuture<'static, Result<Warnings, Error>>,
  {
    self.ongoing.run((kind, site.to_string()), || {
      debug!("Starting {} sync for site {}", kind, site);
      start()
    })
  }

  pub fn sync_time(&self, kind: SyncKind, site: &str) -> Option<Instant> {
    self.sync_times.lock().unwrap_or_else(PoisonError::into_inner).get(&(kind, site.to_string())).copied()
  }

  pub fn set_sync_time(&self, kind: SyncKind, site: &str, time: Instant) {
    self.sync_times.lock().unwrap_or_else(PoisonError::into_inner).insert((kind, site.to_string()), time);
  }

  /// True when the last successful sync is older than the sync interval, or
  /// there never was one.
  pub fn is_sync_needed(&self, kind: SyncKind, site: &str) -> bool {
    match self.sync_time(kind, site) {
      Some(time) => time.elapsed() >= self.sync_interval,
      None => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use futures::FutureExt;
  use pretty_assertions::assert_eq;
  use tokio::sync::oneshot;

  use super::*;

  fn counted(
    counter: &Arc<AtomicUsize>,
    result: Result<Warnings, Error>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<Warnings, Error>> {
    let counter = counter.clone();
    move || {
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        result
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_concurrent_syncs_share_result() {
    let coordinator = SyncCoordinator::new(Duration::from_secs(60));
    let runs = Arc::new(AtomicUsize::new(0));
    let warnings = Warnings(vec!["theme: rejected".to_string()]);

    let first = coordinator.sync(SyncKind::Preferences, "site1", counted(&runs, Ok(warnings.clone())));
    let second = coordinator.sync(SyncKind::Preferences, "site1", counted(&runs, Ok(Warnings::default())));
    assert!(coordinator.is_syncing(SyncKind::Preferences, "site1"));

    let (a, b) = tokio::join!(first, second);
    assert_eq!(a, Ok(warnings.clone()));
    assert_eq!(b, Ok(warnings));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_syncs_share_error() {
    let coordinator = SyncCoordinator::new(Duration::from_secs(60));
    let runs = Arc::new(AtomicUsize::new(0));
    let error = Error::Network("connection reset".to_string());

    let first = coordinator.sync(SyncKind::Preferences, "site1", counted(&runs, Err(error.clone())));
    let second = coordinator.sync(SyncKind::Preferences, "site1", counted(&runs, Ok(Warnings::default())));

    let (a, b) = tokio::join!(first, second);
    assert_eq!(a, Err(error.clone()));
    assert_eq!(b, Err(error));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_settled_sync_allows_new_operation() {
    let coordinator = SyncCoordinator::new(Duration::from_secs(60));
    let runs = Arc::new(AtomicUsize::new(0));

    let failed = coordinator
      .sync(SyncKind::Preferences, "site1", counted(&runs, Err(Error::Network("offline".to_string()))))
      .await;
    assert!(failed.is_err());
    assert!(!coordinator.is_syncing(SyncKind::Preferences, "site1"));
    assert!(coordinator.ongoing_sync(SyncKind::Preferences, "site1").is_none());

    let succeeded = coordinator.sync(SyncKind::Preferences, "site1", counted(&runs, Ok(Warnings::default()))).await;
    assert_eq!(succeeded, Ok(Warnings::default()));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_sites_sync_independently() {
    let coordinator = SyncCoordinator::new(Duration::from_secs(60));
    let (release, released) = oneshot::channel::<()>();

    let blocked = coordinator.sync(SyncKind::Preferences, "site1", move || {
      async move {
        let _ = released.await;
        Ok(Warnings::default())
      }
      .boxed()
    });
    let other = coordinator
      .sync(SyncKind::Preferences, "site2", || async { Ok(Warnings(vec!["other".to_string()])) }.boxed())
      .await;

    assert_eq!(other, Ok(Warnings(vec!["other".to_string()])));
    assert!(coordinator.is_syncing(SyncKind::Preferences, "site1"));
    let _ = release.send(());
    assert_eq!(blocked.await, Ok(Warnings::default()));
  }

  #[tokio::test(start_paused = true)]
  async fn test_sync_needed_after_interval() {
    let coordinator = SyncCoordinator::new(Duration::from_secs(300));
    assert!(coordinator.is_sync_needed(SyncKind::Preferences, "site1"));

    coordinator.set_sync_time(SyncKind::Preferences, "site1", Instant::now());
    assert!(!coordinator.is_sync_needed(SyncKind::Preferences, "site1"));

    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(coordinator.is_sync_needed(SyncKind::Preferences, "site1"));
  }

  #[test]
  fn test_sync_kind_display() {
    assert_eq!(SyncKind::Preferences.to_string(), "preferences");
  }
}
