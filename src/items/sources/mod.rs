use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::traits::item_source::PageItems;
use crate::{
  error::Error,
  remote::{CacheInvalidator, RemoteData, SourceIdentity},
};

pub mod course_competencies;
pub mod user_badges;

/// Site collaborators every item source is built with.
#[derive(Clone)]
pub struct SourceServices {
  pub remote: Arc<dyn RemoteData>,
  pub cache: Arc<dyn CacheInvalidator>,
}

impl SourceServices {
  /// Fetches page `page` of `identity` and decodes its items.
  pub async fn fetch_page<T: DeserializeOwned>(
    &self,
    identity: &SourceIdentity,
    page: usize,
    page_length: Option<usize>,
  ) -> Result<PageItems<T>, Error> {
    let offset = page_length.map_or(0, |length| page * length);
    let remote_page = self.remote.fetch_page(identity, offset, page_length).await?;
    let items = remote_page.items.into_iter().map(|value| decode(identity, value)).collect::<Result<Vec<T>, _>>()?;
    Ok(PageItems { items, has_more_items: remote_page.can_load_more })
  }

  /// Fetches and decodes a single record, `None` when the site has none.
  pub async fn fetch_record<T: DeserializeOwned>(&self, identity: &SourceIdentity) -> Result<Option<T>, Error> {
    self.remote.fetch_record(identity).await?.map(|value| decode(identity, value)).transpose()
  }

  /// Invalidates every identity given, ignoring failures.
  pub async fn invalidate(&self, identities: &[SourceIdentity]) {
    for identity in identities {
      if let Err(err) = self.cache.invalidate(identity).await {
        warn!("Ignoring failure to invalidate {}: {}", identity, err);
      }
    }
  }
}

fn decode<T: DeserializeOwned>(identity: &SourceIdentity, value: Value) -> Result<T, Error> {
  serde_json::from_value(value).map_err(|err| Error::Decode { identity: identity.key(), reason: err.to_string() })
}
