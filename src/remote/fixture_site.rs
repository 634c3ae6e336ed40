use std::{
  collections::HashMap,
  path::Path,
  sync::{Mutex, PoisonError, RwLock},
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
  error::Error,
  remote::types::{CacheInvalidator, PreferencesApi, RemoteData, RemotePage, SiteId, SourceIdentity},
  sync::offline_store::PreferenceEntry,
};

/// Site contents keyed by [`SourceIdentity::key`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureData {
  #[serde(default)]
  pub lists: HashMap<String, Vec<Value>>,
  #[serde(default)]
  pub records: HashMap<String, Value>,
  #[serde(default)]
  pub sites: HashMap<SiteId, SiteFixture>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteFixture {
  /// Current preference values on the site.
  #[serde(default)]
  pub preferences: HashMap<String, String>,
  /// Preferences the site refuses to update, answering with a validation error.
  #[serde(default)]
  pub rejected_preferences: Vec<String>,
  /// Changes made on the device while offline, waiting to be synced.
  #[serde(default)]
  pub offline_preferences: Vec<PreferenceEntry>,
}

/// A site served from a JSON document instead of a live web service.
#[derive(Debug, Default)]
pub struct FixtureSite {
  data: RwLock<FixtureData>,
  invalidated: Mutex<Vec<String>>,
}

impl FixtureSite {
  pub fn new(data: FixtureData) -> Self {
    FixtureSite { data: RwLock::new(data), invalidated: Mutex::new(Vec::new()) }
  }

  pub fn from_json(json: &str) -> Result<Self, Error> {
    let data: FixtureData = serde_json::from_str(json).map_err(|err| Error::Fixture(err.to_string()))?;
    Ok(FixtureSite::new(data))
  }

  pub async fn from_file(path: &Path) -> Result<Self, Error> {
    info!("Loading site fixture from {}", path.display());
    let json = tokio::fs::read_to_string(path).await?;
    FixtureSite::from_json(&json)
  }

  pub fn site_ids(&self) -> Vec<SiteId> {
    let mut ids: Vec<SiteId> = self.data.read().unwrap_or_else(PoisonError::into_inner).sites.keys().cloned().collect();
    ids.sort();
    ids
  }

  /// The offline changes recorded in the fixture, per site.
  pub fn offline_seed(&self) -> HashMap<SiteId, Vec<PreferenceEntry>> {
    let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
    data.sites.iter().map(|(site, fixture)| (site.clone(), fixture.offline_preferences.clone())).collect()
  }

  pub fn set_list(&self, identity: &SourceIdentity, items: Vec<Value>) {
    self.data.write().unwrap_or_else(PoisonError::into_inner).lists.insert(identity.key(), items);
  }

  pub fn set_record(&self, identity: &SourceIdentity, record: Value) {
    self.data.write().unwrap_or_else(PoisonError::into_inner).records.insert(identity.key(), record);
  }

  pub fn set_remote_preference(&self, site: &str, name: &str, value: &str) {
    let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
    data.sites.entry(site.to_string()).or_default().preferences.insert(name.to_string(), value.to_string());
  }

  pub fn reject_preference(&self, site: &str, name: &str) {
    let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
    data.sites.entry(site.to_string()).or_default().rejected_preferences.push(name.to_string());
  }

  pub fn remote_preference(&self, site: &str, name: &str) -> Option<String> {
    let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
    data.sites.get(site).and_then(|fixture| fixture.preferences.get(name).cloned())
  }

  /// Identity keys invalidated so far, in call order.
  pub fn invalidated(&self) -> Vec<String> {
    self.invalidated.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

#[async_trait]
impl RemoteData for FixtureSite {
  async fn fetch_page(
    &self,
    identity: &SourceIdentity,
    offset: usize,
    limit: Option<usize>,
  ) -> Result<RemotePage, Error> {
    let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
    let Some(list) = data.lists.get(&identity.key()) else {
      debug!("No fixture list for {}", identity);
      return Ok(RemotePage::default());
    };
    let start = offset.min(list.len());
    let end = limit.map_or(list.len(), |limit| (start + limit).min(list.len()));
    Ok(RemotePage { items: list[start..end].to_vec(), can_load_more: end < list.len() })
  }

  async fn fetch_record(&self, identity: &SourceIdentity) -> Result<Option<Value>, Error> {
    Ok(self.data.read().unwrap_or_else(PoisonError::into_inner).records.get(&identity.key()).cloned())
  }
}

#[async_trait]
impl CacheInvalidator for FixtureSite {
  async fn invalidate(&self, identity: &SourceIdentity) -> Result<(), Error> {
    debug!("Invalidating cached responses for {}", identity);
    self.invalidated.lock().unwrap_or_else(PoisonError::into_inner).push(identity.key());
    Ok(())
  }
}

#[async_trait]
impl PreferencesApi for FixtureSite {
  async fn user_preference(&self, site: &str, name: &str) -> Result<Option<String>, Error> {
    let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
    let fixture = data.sites.get(site).ok_or_else(|| Error::Network(format!("site {} is not reachable", site)))?;
    Ok(fixture.preferences.get(name).cloned())
  }

  async fn set_user_preference(&self, site: &str, name: &str, value: &str) -> Result<(), Error> {
    let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
    let fixture = data.sites.get_mut(site).ok_or_else(|| Error::Network(format!("site {} is not reachable", site)))?;
    if fixture.rejected_preferences.iter().any(|rejected| rejected == name) {
      return Err(Error::web_service("invalidparameter", format!("Invalid value for preference {}", name)));
    }
    fixture.preferences.insert(name.to_string(), value.to_string());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn numbered(count: usize) -> Vec<Value> {
    (1..=count).map(|n| json!({ "id": n })).collect()
  }

  #[tokio::test]
  async fn test_fetch_page_slices_list() {
    let site = FixtureSite::default();
    let identity = SourceIdentity::new("things");
    site.set_list(&identity, numbered(5));

    let page = site.fetch_page(&identity, 2, Some(2)).await.unwrap();
    assert_eq!(page.items, vec![json!({ "id": 3 }), json!({ "id": 4 })]);
    assert!(page.can_load_more);

    let last = site.fetch_page(&identity, 4, Some(2)).await.unwrap();
    assert_eq!(last.items, vec![json!({ "id": 5 })]);
    assert!(!last.can_load_more);
  }

  #[tokio::test]
  async fn test_fetch_page_without_limit_returns_rest() {
    let site = FixtureSite::default();
    let identity = SourceIdentity::new("things");
    site.set_list(&identity, numbered(3));

    let page = site.fetch_page(&identity, 1, None).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.can_load_more);
  }

  #[tokio::test]
  async fn test_unknown_list_is_empty() {
    let site = FixtureSite::default();
    let page = site.fetch_page(&SourceIdentity::new("missing"), 0, Some(10)).await.unwrap();
    assert_eq!(page, RemotePage::default());
  }

  #[tokio::test]
  async fn test_rejected_preference_is_a_web_service_error() {
    let site = FixtureSite::default();
    site.set_remote_preference("site1", "theme", "dark");
    site.reject_preference("site1", "theme");

    let err = site.set_user_preference("site1", "theme", "light").await.unwrap_err();
    assert!(err.is_web_service_error());
    assert_eq!(site.remote_preference("site1", "theme"), Some("dark".to_string()));
  }

  #[tokio::test]
  async fn test_unknown_site_is_unreachable() {
    let site = FixtureSite::default();
    let err = site.user_preference("nowhere", "theme").await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
  }

  #[test]
  fn test_from_json_reads_sites() {
    let site = FixtureSite::from_json(
      r#"{
        "sites": {
          "b": { "preferences": { "theme": "dark" } },
          "a": { "offline_preferences": [{ "name": "theme", "value": "light", "online_value": "dark" }] }
        }
      }"#,
    )
    .unwrap();

    assert_eq!(site.site_ids(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(site.offline_seed()["a"].len(), 1);
    assert_eq!(site.remote_preference("b", "theme"), Some("dark".to_string()));
  }
}
