use std::sync::Arc;

use futures::{FutureExt, future::join_all};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
  coordinator::{SyncCoordinator, SyncKind, Warnings},
  offline_store::{OfflinePreferences, PreferenceEntry},
};
use crate::{
  error::Error,
  remote::{PreferencesApi, SiteId},
};

/// Pushes user preferences changed while offline to their site.
#[derive(Clone)]
pub struct PreferencesSync {
  coordinator: Arc<SyncCoordinator>,
  api: Arc<dyn PreferencesApi>,
  store: Arc<dyn OfflinePreferences>,
}

impl PreferencesSync {
  pub fn new(
    coordinator: Arc<SyncCoordinator>,
    api: Arc<dyn PreferencesApi>,
    store: Arc<dyn OfflinePreferences>,
  ) -> Self {
    PreferencesSync { coordinator, api, store }
  }

  /// Syncs the preferences of `site`, joining the sync already running for it if any.
  pub async fn sync_preferences(&self, site: &str) -> Result<Warnings, Error> {
    if self.coordinator.is_syncing(SyncKind::Preferences, site) {
      debug!("Preferences sync for {} already in progress, waiting for it", site);
    }
    let this = self.clone();
    let site_id = site.to_string();
    self
      .coordinator
      .sync(SyncKind::Preferences, site, move || {
        async move {
          let warnings = this.perform_sync_site_preferences(&site_id).await?;
          this.coordinator.set_sync_time(SyncKind::Preferences, &site_id, Instant::now());
          Ok(warnings)
        }
        .boxed()
      })
      .await
  }

  /// Like [`PreferencesSync::sync_preferences`] but returns `None` without
  /// syncing when the last successful sync is within the sync interval.
  pub async fn sync_preferences_if_needed(&self, site: &str) -> Result<Option<Warnings>, Error> {
    if !self.coordinator.is_sync_needed(SyncKind::Preferences, site) {
      debug!("Preferences of {} synced recently, skipping", site);
      return Ok(None);
    }
    self.sync_preferences(site).await.map(Some)
  }

  /// Syncs every site concurrently. `force` ignores the sync interval.
  pub async fn sync_all_preferences(
    &self,
    sites: &[SiteId],
    force: bool,
  ) -> Vec<(SiteId, Result<Option<Warnings>, Error>)> {
    info!("Syncing preferences of {} site(s)", sites.len());
    let syncs = sites.iter().map(|site| async move {
      let result = if force {
        self.sync_preferences(site).await.map(Some)
      } else {
        self.sync_preferences_if_needed(site).await
      };
      (site.clone(), result)
    });
    join_all(syncs).await
  }

  /// Pushes every changed preference of `site` in order.
  ///
  /// A preference also changed on the site since it was last seen takes the
  /// site value and is not pushed. Web service rejections become warnings and
  /// the rejected local change is discarded: the entry goes back to its online
  /// value, or is removed when it never had one. Any other error aborts the
  /// batch and leaves the remaining entries untouched.
  pub async fn perform_sync_site_preferences(&self, site: &str) -> Result<Warnings, Error> {
    let preferences = self.store.changed_preferences(site).await?;
    debug!("{} changed preference(s) to sync for {}", preferences.len(), site);

    let mut warnings = Warnings::default();
    for preference in preferences {
      if let Some(warning) = self.sync_preference(site, &preference).await? {
        warnings.push(warning);
      }
    }
    Ok(warnings)
  }

  async fn sync_preference(&self, site: &str, preference: &PreferenceEntry) -> Result<Option<String>, Error> {
    let name = preference.name.as_str();
    let remote_value = self.api.user_preference(site, name).await?;
    if let Some(remote_value) = remote_value {
      if preference.online_value.as_deref() != Some(remote_value.as_str()) {
        info!("Preference {} changed on {} while offline, keeping the site value", name, site);
        self.store.set_preference(site, name, &remote_value, Some(&remote_value)).await?;
        return Ok(None);
      }
    }

    match self.api.set_user_preference(site, name, &preference.value).await {
      Ok(()) => {
        self.store.set_preference(site, name, &preference.value, Some(&preference.value)).await?;
        Ok(None)
      },
      Err(err) if err.is_web_service_error() => {
        warn!("Site {} rejected preference {}: {}", site, name, err);
        match preference.online_value.as_deref() {
          Some(online_value) => self.store.set_preference(site, name, online_value, Some(online_value)).await?,
          None => self.store.delete_preference(site, name).await?,
        }
        Ok(Some(format!("Preference {} could not be synced: {}", name, err)))
      },
      Err(err) => Err(err),
    }
  }
}
