pub mod fixture_site;
#[cfg(test)]
pub mod mock_site;
pub mod types;

pub use fixture_site::FixtureSite;
pub use types::{CacheInvalidator, PreferencesApi, RemoteData, RemotePage, SiteId, SourceIdentity};
