use std::sync::Arc;

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

const CONTEXT_NAME: &str = "course competencies";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
  pub id: u64,
  pub shortname: String,
  #[serde(default)]
  pub idnumber: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCompetency {
  pub competency: Competency,
  #[serde(default)]
  pub proficient: Option<bool>,
  #[serde(default)]
  pub grade: Option<String>,
}

impl ManagedItem for CourseCompetency {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyStatistics {
  pub competency_count: u32,
  pub proficient_competency_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCompetencies {
  #[serde(default)]
  pub statistics: CompetencyStatistics,
  pub competencies: Vec<CourseCompetency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: u64,
  pub fullname: String,
}

/// Course competency summary plus, when viewing another user, their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetenciesContext {
  pub course: CourseCompetencies,
  pub user: Option<UserProfile>,
}

/// The competencies of a course, as seen by one user. All of them come with
/// the course summary, so there is a single page.
pub struct CourseCompetenciesSource {
  identity: SourceIdentity,
  course_id: u64,
  user_id: Option<u64>,
  services: SourceServices,
  state: SourceState<CompetenciesContext>,
}

impl CourseCompetenciesSource {
  pub fn identity_for(course_id: u64, user_id: Option<u64>) -> SourceIdentity {
    let identity = SourceIdentity::new("course_competencies").param("courseid", course_id);
    match user_id {
      Some(user_id) => identity.param("userid", user_id),
      None => identity,
    }
  }

  pub fn profile_identity(course_id: u64, user_id: u64) -> SourceIdentity {
    SourceIdentity::new("user_profile").param("courseid", course_id).param("userid", user_id)
  }

  pub fn new(course_id: u64, user_id: Option<u64>, services: SourceServices) -> Self {
    CourseCompetenciesSource {
      identity: Self::identity_for(course_id, user_id),
      course_id,
      user_id,
      services,
      state: SourceState::new(),
    }
  }

  pub fn context(&self) -> Option<Arc<CompetenciesContext>> {
    self.state.context()
  }

  async fn fetch_context(&self) -> Result<Option<CompetenciesContext>, Error> {
    let profile = async {
      match self.user_id {
        Some(user_id) => {
          self.services.fetch_record::<UserProfile>(&Self::profile_identity(self.course_id, user_id)).await
        },
        None => Ok(None),
      }
    };
    let (course, user) = tokio::try_join!(self.services.fetch_record::<CourseCompetencies>(&self.identity), profile)?;
    Ok(course.map(|course| CompetenciesContext { course, user }))
  }
}

#[async_trait]
impl ItemSource for CourseCompetenciesSource {
  type Item = CourseCompetency;

  fn identity(&self) -> &SourceIdentity {
    &self.identity
  }

  fn item_path(&self, item: &CourseCompetency) -> String {
    item.competency.id.to_string()
  }

  fn is_dirty(&self) -> bool {
    self.state.is_dirty()
  }

  fn set_dirty(&self, dirty: bool) {
    self.state.set_dirty(dirty);
  }

  async fn load(&self) -> Result<(), Error> {
    if self.state.needs_refresh() {
      self.state.refresh(CONTEXT_NAME, || self.fetch_context()).await?;
    }
    Ok(())
  }

  async fn load_page_items(&self, page: usize) -> Result<PageItems<CourseCompetency>, Error> {
    let context = self.state.require(CONTEXT_NAME)?;
    let items = if page == 0 { context.course.competencies.clone() } else { Vec::new() };
    Ok(PageItems::last(items))
  }

  async fn invalidate_cache(&self) {
    let mut identities = vec![self.identity.clone()];
    if let Some(user_id) = self.user_id {
      identities.push(Self::profile_identity(self.course_id, user_id));
    }
    self.services.invalidate(&identities).await;
  }
}
