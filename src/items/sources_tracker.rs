use std::{
  any::Any,
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError, Weak},
};

use tracing::{debug, warn};

use crate::remote::SourceIdentity;

type ErasedSource = dyn Any + Send + Sync;

/// Hands out one shared source per identity for as long as anyone holds it.
///
/// Only weak references are kept, so a source lives exactly as long as its
/// longest holder.
#[derive(Default)]
pub struct SourcesTracker {
  sources: Mutex<HashMap<String, Weak<ErasedSource>>>,
}

impl SourcesTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the live source registered for `identity`, or registers the one
  /// built by `create`.
  pub fn get_or_create<S, F>(&self, identity: &SourceIdentity, create: F) -> Arc<S>
  where
    S: Any + Send + Sync,
    F: FnOnce() -> S,
  {
    let key = identity.key();
    let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = sources.get(&key).and_then(Weak::upgrade) {
      match existing.downcast::<S>() {
        Ok(source) => {
          debug!("Reusing source {}", key);
          return source;
        },
        Err(_) => warn!("Source {} was registered with another type, replacing it", key),
      }
    }

    let source = Arc::new(create());
    let erased: Arc<ErasedSource> = source.clone();
    sources.insert(key, Arc::downgrade(&erased));
    source
  }

  /// Drops registrations whose source is gone and counts the rest.
  pub fn live_sources(&self) -> usize {
    let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
    sources.retain(|_, source| source.strong_count() > 0);
    sources.len()
  }
}
