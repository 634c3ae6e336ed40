use std::{
  future::Future,
  sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
  },
};

use tracing::debug;

use crate::error::Error;

/// Dirty flag and cached ancillary context shared by item sources.
#[derive(Debug)]
pub struct SourceState<C> {
  dirty: AtomicBool,
  context: RwLock<Option<Arc<C>>>,
}

impl<C> Default for SourceState<C> {
  fn default() -> Self {
    SourceState { dirty: AtomicBool::new(false), context: RwLock::new(None) }
  }
}

impl<C: Send + Sync> SourceState<C> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty.load(Ordering::SeqCst)
  }

  pub fn set_dirty(&self, dirty: bool) {
    self.dirty.store(dirty, Ordering::SeqCst);
  }

  pub fn context(&self) -> Option<Arc<C>> {
    self.context.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn needs_refresh(&self) -> bool {
    self.is_dirty() || self.context().is_none()
  }

  /// The cached context, or [`Error::MissingContext`] naming `what` was needed.
  pub fn require(&self, what: &str) -> Result<Arc<C>, Error> {
    self.context().ok_or_else(|| Error::MissingContext(what.to_string()))
  }

  /// Re-fetches the context with `fetch` when dirty or missing. A fetch that
  /// finds nothing is a [`Error::MissingContext`].
  pub async fn refresh<F, Fut>(&self, what: &str, fetch: F) -> Result<Arc<C>, Error>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<C>, Error>>,
  {
    if !self.is_dirty() {
      if let Some(context) = self.context() {
        return Ok(context);
      }
    }
    debug!("Fetching {}", what);
    let context = Arc::new(fetch().await?.ok_or_else(|| Error::MissingContext(what.to_string()))?);
    *self.context.write().unwrap_or_else(PoisonError::into_inner) = Some(context.clone());
    Ok(context)
  }
}
