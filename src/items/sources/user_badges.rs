use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SourceServices;
use crate::{
  error::Error,
  items::{
    source_state::SourceState,
    traits::{
      item_source::{ItemSource, PageItems},
      managed_item::ManagedItem,
    },
  },
  remote::SourceIdentity,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
  pub unique_hash: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub date_issued: Option<i64>,
}

impl ManagedItem for Badge {}

/// Badges a user earned, optionally within one course.
pub struct UserBadgesSource {
  identity: SourceIdentity,
  course_id: u64,
  user_id: u64,
  page_length: Option<usize>,
  services: SourceServices,
  state: SourceState<()>,
}

impl UserBadgesSource {
  pub fn identity_for(course_id: u64, user_id: u64) -> SourceIdentity {
    SourceIdentity::new("user_badges").param("courseid", course_id).param("userid", user_id)
  }

  pub fn new(course_id: u64, user_id: u64, page_length: Option<usize>, services: SourceServices) -> Self {
    UserBadgesSource {
      identity: Self::identity_for(course_id, user_id),
      course_id,
      user_id,
      page_length,
      services,
      state: SourceState::new(),
    }
  }
}

#[async_trait]
impl ItemSource for UserBadgesSource {
  type Item = Badge;

  fn identity(&self) -> &SourceIdentity {
    &self.identity
  }

  fn item_path(&self, badge: &Badge) -> String {
    badge.unique_hash.clone()
  }

  fn item_query_params(&self, _badge: &Badge) -> BTreeMap<String, String> {
    BTreeMap::from([
      ("courseId".to_string(), self.course_id.to_string()),
      ("userId".to_string(), self.user_id.to_string()),
    ])
  }

  fn page_length(&self) -> Option<usize> {
    self.page_length
  }

  fn is_dirty(&self) -> bool {
    self.state.is_dirty()
  }

  fn set_dirty(&self, dirty: bool) {
    self.state.set_dirty(dirty);
  }

  async fn load_page_items(&self, page: usize) -> Result<PageItems<Badge>, Error> {
    self.services.fetch_page(&self.identity, page, self.page_length).await
  }

  async fn invalidate_cache(&self) {
    self.services.invalidate(std::slice::from_ref(&self.identity)).await;
  }
}
