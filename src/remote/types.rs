use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

pub type SiteId = String;

/// The immutable parameters that pick out one slice of remote data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentity {
  pub kind: String,
  pub params: BTreeMap<String, String>,
}

impl SourceIdentity {
  pub fn new(kind: impl Into<String>) -> Self {
    SourceIdentity { kind: kind.into(), params: BTreeMap::new() }
  }

  pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
    self.params.insert(name.into(), value.to_string());
    self
  }

  /// Stable string form, `kind?a=1&b=2` with parameters sorted by name.
  pub fn key(&self) -> String {
    if self.params.is_empty() {
      return self.kind.clone();
    }
    let query: Vec<String> = self.params.iter().map(|(name, value)| format!("{}={}", name, value)).collect();
    format!("{}?{}", self.kind, query.join("&"))
  }
}

impl fmt::Display for SourceIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.key())
  }
}

/// One page of raw items as returned by the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePage {
  pub items: Vec<Value>,
  pub can_load_more: bool,
}

#[async_trait]
pub trait RemoteData: Send + Sync {
  /// Fetches the items of `identity` starting at `offset`. A `limit` of `None`
  /// asks for everything that is left.
  async fn fetch_page(&self, identity: &SourceIdentity, offset: usize, limit: Option<usize>)
  -> Result<RemotePage, Error>;
  /// Fetches a single ancillary record, `None` when the site has no such record.
  async fn fetch_record(&self, identity: &SourceIdentity) -> Result<Option<Value>, Error>;
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
  async fn invalidate(&self, identity: &SourceIdentity) -> Result<(), Error>;
}

#[async_trait]
pub trait PreferencesApi: Send + Sync {
  async fn user_preference(&self, site: &str, name: &str) -> Result<Option<String>, Error>;
  async fn set_user_preference(&self, site: &str, name: &str, value: &str) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_key_sorts_params() {
    let identity = SourceIdentity::new("user_badges").param("userid", 3).param("courseid", 2);
    assert_eq!(identity.key(), "user_badges?courseid=2&userid=3");
  }

  #[test]
  fn test_key_without_params() {
    assert_eq!(SourceIdentity::new("site_info").key(), "site_info");
  }

  #[test]
  fn test_identities_with_same_params_are_equal() {
    let a = SourceIdentity::new("user_badges").param("courseid", 2).param("userid", 3);
    let b = SourceIdentity::new("user_badges").param("userid", "3").param("courseid", "2");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());
  }
}
