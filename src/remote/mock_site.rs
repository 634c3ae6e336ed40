use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use super::{
  fixture_site::FixtureSite,
  types::{CacheInvalidator, PreferencesApi, RemoteData, RemotePage, SourceIdentity},
};
use crate::error::Error;

/// A [`FixtureSite`] that counts calls, can be slowed down and can be told to fail.
#[derive(Debug, Default)]
pub struct MockSite {
  pub site: FixtureSite,
  latency: Mutex<Option<Duration>>,
  page_error: Mutex<Option<Error>>,
  invalidate_error: Mutex<Option<Error>>,
  push_errors: Mutex<HashMap<String, Error>>,
  page_fetches: AtomicUsize,
  record_fetches: AtomicUsize,
  pushed: Mutex<Vec<String>>,
}

impl MockSite {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_latency(self, latency: Duration) -> Self {
    *self.latency.lock().unwrap() = Some(latency);
    self
  }

  pub fn fail_pages(&self, error: Option<Error>) {
    *self.page_error.lock().unwrap() = error;
  }

  pub fn fail_invalidate(&self, error: Error) {
    *self.invalidate_error.lock().unwrap() = Some(error);
  }

  pub fn fail_push(&self, name: &str, error: Error) {
    self.push_errors.lock().unwrap().insert(name.to_string(), error);
  }

  pub fn page_fetches(&self) -> usize {
    self.page_fetches.load(Ordering::SeqCst)
  }

  pub fn record_fetches(&self) -> usize {
    self.record_fetches.load(Ordering::SeqCst)
  }

  /// Names of every preference a push was attempted for, in order.
  pub fn pushed(&self) -> Vec<String> {
    self.pushed.lock().unwrap().clone()
  }

  async fn delay(&self) {
    let latency = *self.latency.lock().unwrap();
    if let Some(latency) = latency {
      tokio::time::sleep(latency).await;
    }
  }
}

#[async_trait]
impl RemoteData for MockSite {
  async fn fetch_page(
    &self,
    identity: &SourceIdentity,
    offset: usize,
    limit: Option<usize>,
  ) -> Result<RemotePage, Error> {
    self.page_fetches.fetch_add(1, Ordering::SeqCst);
    self.delay().await;
    let error = self.page_error.lock().unwrap().clone();
    if let Some(error) = error {
      return Err(error);
    }
    self.site.fetch_page(identity, offset, limit).await
  }

  async fn fetch_record(&self, identity: &SourceIdentity) -> Result<Option<Value>, Error> {
    self.record_fetches.fetch_add(1, Ordering::SeqCst);
    self.delay().await;
    self.site.fetch_record(identity).await
  }
}

#[async_trait]
impl CacheInvalidator for MockSite {
  async fn invalidate(&self, identity: &SourceIdentity) -> Result<(), Error> {
    let error = self.invalidate_error.lock().unwrap().clone();
    match error {
      Some(error) => Err(error),
      None => self.site.invalidate(identity).await,
    }
  }
}

#[async_trait]
impl PreferencesApi for MockSite {
  async fn user_preference(&self, site: &str, name: &str) -> Result<Option<String>, Error> {
    self.delay().await;
    self.site.user_preference(site, name).await
  }

  async fn set_user_preference(&self, site: &str, name: &str, value: &str) -> Result<(), Error> {
    self.pushed.lock().unwrap().push(name.to_string());
    self.delay().await;
    let error = self.push_errors.lock().unwrap().get(name).cloned();
    if let Some(error) = error {
      return Err(error);
    }
    self.site.set_user_preference(site, name, value).await
  }
}
