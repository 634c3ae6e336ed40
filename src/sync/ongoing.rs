use std::{
  collections::HashMap,
  fmt::Debug,
  hash::Hash,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::Error;

/// An in-flight operation every interested caller can await.
pub type SharedResult<T> = Shared<BoxFuture<'static, Result<T, Error>>>;

/// Whether [`OngoingOperations::start_or_join`] started the operation or
/// found one already running for the key.
pub enum Flight<T: Clone> {
  Started(SharedResult<T>),
  Joined(SharedResult<T>),
}

impl<T: Clone> Flight<T> {
  pub fn into_shared(self) -> SharedResult<T> {
    match self {
      Flight::Started(shared) | Flight::Joined(shared) => shared,
    }
  }
}

type OngoingMap<K, T> = HashMap<K, SharedResult<T>>;

/// Keeps at most one operation running per key.
///
/// Operations are spawned on the tokio runtime as soon as they are registered,
/// so they run to completion and leave the map even when every caller has
/// stopped waiting.
pub struct OngoingOperations<K, T: Clone> {
  ongoing: Arc<Mutex<OngoingMap<K, T>>>,
}

impl<K, T: Clone> Default for OngoingOperations<K, T> {
  fn default() -> Self {
    OngoingOperations { ongoing: Arc::new(Mutex::new(HashMap::new())) }
  }
}

fn lock<K, T: Clone>(map: &Arc<Mutex<OngoingMap<K, T>>>) -> MutexGuard<'_, OngoingMap<K, T>> {
  map.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, T> OngoingOperations<K, T>
where
  K: Eq + Hash + Clone + Debug + Send + 'static,
  T: Clone + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &K) -> Option<SharedResult<T>> {
    lock(&self.ongoing).get(key).cloned()
  }

  pub fn contains(&self, key: &K) -> bool {
    lock(&self.ongoing).contains_key(key)
  }

  pub fn len(&self) -> usize {
    lock(&self.ongoing).len()
  }

  pub fn is_empty(&self) -> bool {
    lock(&self.ongoing).is_empty()
  }

  /// Joins the operation running for `key`, or registers and spawns the one
  /// built by `start`. `start` only builds the future and must not touch this map.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start_or_join<F>(&self, key: K, start: F) -> Flight<T>
  where
    F: FnOnce() -> BoxFuture<'static, Result<T, Error>>,
  {
    let mut ongoing = lock(&self.ongoing);
    if let Some(existing) = ongoing.get(&key) {
      debug!("Joining ongoing operation {:?}", key);
      return Flight::Joined(existing.clone());
    }

    let operation = start();
    let map = Arc::clone(&self.ongoing);
    let settled_key = key.clone();
    let shared = async move {
      let result = operation.await;
      lock(&map).remove(&settled_key);
      debug!("Operation {:?} settled", settled_key);
      result
    }
    .boxed()
    .shared();

    ongoing.insert(key, shared.clone());
    drop(ongoing);
    tokio::spawn(shared.clone());
    Flight::Started(shared)
  }

  pub fn run<F>(&self, key: K, start: F) -> SharedResult<T>
  where
    F: FnOnce() -> BoxFuture<'static, Result<T, Error>>,
  {
    self.start_or_join(key, start).into_shared()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
  };

  use pretty_assertions::assert_eq;
  use tokio::sync::oneshot;

  use super::*;

  #[tokio::test]
  async fn test_concurrent_callers_share_one_operation() {
    let operations: OngoingOperations<&'static str, usize> = OngoingOperations::new();
    let started = Arc::new(AtomicUsize::new(0));
    let (release, released) = oneshot::channel::<()>();

    let counter = started.clone();
    let first = operations.run("key", move || {
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = released.await;
        Ok(7)
      }
      .boxed()
    });
    let counter = started.clone();
    let second = operations.run("key", move || {
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(8)
      }
      .boxed()
    });

    assert!(operations.contains(&"key"));
    let _ = release.send(());
    let (a, b) = tokio::join!(first, second);

    assert_eq!(a, Ok(7));
    assert_eq!(b, Ok(7));
    assert_eq!(started.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_entry_removed_after_failure() {
    let operations: OngoingOperations<u8, ()> = OngoingOperations::new();

    let result = operations.run(1, || async { Err(Error::Network("down".to_string())) }.boxed()).await;

    assert_eq!(result, Err(Error::Network("down".to_string())));
    assert!(operations.is_empty());
  }

  #[tokio::test]
  async fn test_different_keys_run_independently() {
    let operations: OngoingOperations<u8, u8> = OngoingOperations::new();

    let a = operations.start_or_join(1, || async { Ok(1) }.boxed());
    let b = operations.start_or_join(2, || async { Ok(2) }.boxed());

    assert!(matches!(a, Flight::Started(_)));
    assert!(matches!(b, Flight::Started(_)));
    assert_eq!(a.into_shared().await, Ok(1));
    assert_eq!(b.into_shared().await, Ok(2));
  }

  #[tokio::test]
  async fn test_operation_settles_without_callers() {
    let operations: OngoingOperations<u8, ()> = OngoingOperations::new();
    let (done_tx, done_rx) = oneshot::channel();

    drop(operations.run(1, move || {
      async move {
        let _ = done_tx.send(());
        Ok(())
      }
      .boxed()
    }));

    tokio::time::timeout(Duration::from_secs(1), done_rx).await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
      while operations.contains(&1) {
        tokio::task::yield_now().await;
      }
    })
    .await
    .unwrap();
  }
}
