use std::collections::BTreeMap;

use async_trait::async_trait;

use super::managed_item::ManagedItem;
use crate::{error::Error, remote::SourceIdentity};

/// The items of one page and whether the site has more after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageItems<T> {
  pub items: Vec<T>,
  pub has_more_items: bool,
}

impl<T> PageItems<T> {
  pub fn last(items: Vec<T>) -> Self {
    PageItems { items, has_more_items: false }
  }
}

/// Defines how pages of one slice of remote data are fetched and how each
/// item maps to a routable path.
#[async_trait]
pub trait ItemSource: Send + Sync + 'static {
  type Item: ManagedItem;

  fn identity(&self) -> &SourceIdentity;

  /// Deterministic path of `item`, unique within this source.
  fn item_path(&self, item: &Self::Item) -> String;

  /// Extra routing parameters for a deep link to `item`.
  fn item_query_params(&self, _item: &Self::Item) -> BTreeMap<String, String> {
    BTreeMap::new()
  }

  /// Items per page, `None` when the site returns everything at once.
  fn page_length(&self) -> Option<usize> {
    None
  }

  fn is_dirty(&self) -> bool;

  fn set_dirty(&self, dirty: bool);

  /// Refreshes ancillary context when the source is dirty or the context is
  /// missing. Sources without context have nothing to do.
  async fn load(&self) -> Result<(), Error> {
    Ok(())
  }

  /// Fetches page `page`, counting from zero.
  async fn load_page_items(&self, page: usize) -> Result<PageItems<Self::Item>, Error>;

  /// Marks cached site responses for this source as stale. Best effort.
  async fn invalidate_cache(&self);
}
