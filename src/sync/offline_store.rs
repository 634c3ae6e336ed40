use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::Error, remote::SiteId};

/// A preference as stored on the device. `online_value` is the last value
/// known to be on the site, `None` when the site value was never seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
  pub name: String,
  pub value: String,
  #[serde(default)]
  pub online_value: Option<String>,
}

impl PreferenceEntry {
  pub fn new(name: impl Into<String>, value: impl Into<String>, online_value: Option<&str>) -> Self {
    PreferenceEntry { name: name.into(), value: value.into(), online_value: online_value.map(String::from) }
  }

  /// Changed locally and not yet pushed to the site.
  pub fn is_changed(&self) -> bool {
    self.online_value.as_deref() != Some(self.value.as_str())
  }
}

#[async_trait]
pub trait OfflinePreferences: Send + Sync {
  /// Entries whose value differs from their online value, in the order they were first stored.
  async fn changed_preferences(&self, site: &str) -> Result<Vec<PreferenceEntry>, Error>;
  async fn preference(&self, site: &str, name: &str) -> Result<Option<PreferenceEntry>, Error>;
  async fn set_preference(&self, site: &str, name: &str, value: &str, online_value: Option<&str>) -> Result<(), Error>;
  async fn delete_preference(&self, site: &str, name: &str) -> Result<(), Error>;
}

#[derive(Debug, Default)]
pub struct MemoryOfflinePreferences {
  sites: RwLock<HashMap<SiteId, Vec<PreferenceEntry>>>,
}

impl MemoryOfflinePreferences {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_entries(entries: HashMap<SiteId, Vec<PreferenceEntry>>) -> Self {
    MemoryOfflinePreferences { sites: RwLock::new(entries) }
  }
}

#[async_trait]
impl OfflinePreferences for MemoryOfflinePreferences {
  async fn changed_preferences(&self, site: &str) -> Result<Vec<PreferenceEntry>, Error> {
    let sites = self.sites.read().await;
    let entries = sites.get(site).map(|entries| entries.iter().filter(|entry| entry.is_changed()).cloned().collect());
    Ok(entries.unwrap_or_default())
  }

  async fn preference(&self, site: &str, name: &str) -> Result<Option<PreferenceEntry>, Error> {
    let sites = self.sites.read().await;
    Ok(sites.get(site).and_then(|entries| entries.iter().find(|entry| entry.name == name).cloned()))
  }

  async fn set_preference(&self, site: &str, name: &str, value: &str, online_value: Option<&str>) -> Result<(), Error> {
    let mut sites = self.sites.write().await;
    let entries = sites.entry(site.to_string()).or_default();
    let updated = PreferenceEntry::new(name, value, online_value);
    match entries.iter_mut().find(|entry| entry.name == name) {
      Some(entry) => *entry = updated,
      None => entries.push(updated),
    }
    Ok(())
  }

  async fn delete_preference(&self, site: &str, name: &str) -> Result<(), Error> {
    let mut sites = self.sites.write().await;
    if let Some(entries) = sites.get_mut(site) {
      entries.retain(|entry| entry.name != name);
    }
    Ok(())
  }
}
