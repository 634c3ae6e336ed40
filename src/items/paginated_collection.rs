use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use strum::Display;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use super::traits::item_source::{ItemSource, PageItems};
use crate::{
  error::Error,
  sync::ongoing::{Flight, OngoingOperations},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CollectionStatus {
  Uninitialized,
  Loading,
  Loaded,
  Reloading,
}

/// Sent to subscribers whenever the collection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
  ItemsUpdated(usize),
  Reset,
}

struct CollectionState<T> {
  items: Vec<T>,
  status: CollectionStatus,
  next_page: usize,
  completed: bool,
  listeners: Vec<UnboundedSender<CollectionEvent>>,
}

impl<T> CollectionState<T> {
  fn new() -> Self {
    CollectionState {
      items: Vec::new(),
      status: CollectionStatus::Uninitialized,
      next_page: 0,
      completed: false,
      listeners: Vec::new(),
    }
  }

  fn notify(&mut self, event: CollectionEvent) {
    self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
  }
}

struct CollectionInner<S: ItemSource> {
  source: Arc<S>,
  state: Mutex<CollectionState<S::Item>>,
}

impl<S: ItemSource> CollectionInner<S> {
  fn lock_state(&self) -> MutexGuard<'_, CollectionState<S::Item>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Clears the items. Returns whether anything had been loaded.
  fn reset(&self) -> bool {
    let mut state = self.lock_state();
    let was_loaded = state.status == CollectionStatus::Loaded;
    state.items.clear();
    state.status = CollectionStatus::Uninitialized;
    state.next_page = 0;
    state.completed = false;
    state.notify(CollectionEvent::Reset);
    was_loaded
  }

  async fn reload(&self) -> Result<(), Error> {
    if self.reset() {
      self.lock_state().status = CollectionStatus::Reloading;
    }
    self.load_next_page().await
  }

  async fn load_next_page(&self) -> Result<(), Error> {
    let dirty = self.source.is_dirty();
    let page = {
      let mut state = self.lock_state();
      if state.status == CollectionStatus::Loaded && state.completed && !dirty {
        debug!("All items of {} already loaded", self.source.identity());
        return Ok(());
      }
      if state.status == CollectionStatus::Uninitialized {
        state.status = CollectionStatus::Loading;
      }
      if dirty { 0 } else { state.next_page }
    };

    debug!("Loading page {} of {}", page, self.source.identity());
    let result = match self.source.load().await {
      Ok(()) => self.source.load_page_items(page).await,
      Err(err) => Err(err),
    };

    let mut state = self.lock_state();
    match result {
      Ok(PageItems { items, has_more_items }) => {
        if dirty {
          state.items = items;
          self.source.set_dirty(false);
        } else {
          state.items.extend(items);
        }
        state.next_page = page + 1;
        state.completed = !has_more_items;
        state.status = CollectionStatus::Loaded;
        let count = state.items.len();
        state.notify(CollectionEvent::ItemsUpdated(count));
        Ok(())
      },
      Err(err) => {
        warn!("Failed to load page {} of {}: {}", page, self.source.identity(), err);
        if state.status != CollectionStatus::Loaded {
          state.status = CollectionStatus::Uninitialized;
        }
        Err(err)
      },
    }
  }
}

/// Accumulates the pages of an [`ItemSource`] into one ordered list.
///
/// Loads, reloads and resets are serialized: a call made while one of them is
/// running waits for it, and concurrent `load` calls share a single page fetch.
pub struct PaginatedCollection<S: ItemSource> {
  inner: Arc<CollectionInner<S>>,
  operations: OngoingOperations<(), ()>,
}

impl<S: ItemSource> PaginatedCollection<S> {
  pub fn new(source: Arc<S>) -> Self {
    PaginatedCollection {
      inner: Arc::new(CollectionInner { source, state: Mutex::new(CollectionState::new()) }),
      operations: OngoingOperations::new(),
    }
  }

  pub fn source(&self) -> &Arc<S> {
    &self.inner.source
  }

  pub fn items(&self) -> Vec<S::Item> {
    self.inner.lock_state().items.clone()
  }

  pub fn len(&self) -> usize {
    self.inner.lock_state().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock_state().items.is_empty()
  }

  pub fn status(&self) -> CollectionStatus {
    self.inner.lock_state().status
  }

  pub fn is_loaded(&self) -> bool {
    self.status() == CollectionStatus::Loaded
  }

  /// True once the site reported there are no more pages.
  pub fn is_completed(&self) -> bool {
    self.inner.lock_state().completed
  }

  pub fn item_path(&self, item: &S::Item) -> String {
    self.inner.source.item_path(item)
  }

  /// Resolves a deep-link path back to a loaded item.
  pub fn item_for_path(&self, path: &str) -> Option<S::Item> {
    let state = self.inner.lock_state();
    state.items.iter().find(|item| self.inner.source.item_path(item) == path).cloned()
  }

  pub fn subscribe(&self) -> UnboundedReceiver<CollectionEvent> {
    let (tx, rx) = unbounded_channel();
    self.inner.lock_state().listeners.push(tx);
    rx
  }

  /// Loads the next page, or page zero again when the source is dirty. Does
  /// nothing once every page is loaded and the source is clean.
  pub async fn load(&self) -> Result<(), Error> {
    let inner = Arc::clone(&self.inner);
    self.operations.run((), move || async move { inner.load_next_page().await }.boxed()).await
  }

  /// Drops every loaded item and loads page zero. Cached site responses are
  /// left alone; call [`ItemSource::invalidate_cache`] first to refetch them.
  pub async fn reload(&self) -> Result<(), Error> {
    loop {
      let inner = Arc::clone(&self.inner);
      match self.operations.start_or_join((), move || async move { inner.reload().await }.boxed()) {
        Flight::Started(reload) => return reload.await,
        Flight::Joined(ongoing) => {
          let _ = ongoing.await;
        },
      }
    }
  }

  /// Drops every loaded item without fetching anything.
  pub async fn reset(&self) {
    loop {
      let inner = Arc::clone(&self.inner);
      let reset = move || {
        async move {
          inner.reset();
          Ok(())
        }
        .boxed()
      };
      match self.operations.start_or_join((), reset) {
        Flight::Started(reset) => {
          let _ = reset.await;
          return;
        },
        Flight::Joined(ongoing) => {
          let _ = ongoing.await;
        },
      }
    }
  }
}
