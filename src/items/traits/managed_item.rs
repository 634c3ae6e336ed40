use std::fmt::Debug;

use serde::de::DeserializeOwned;

/// Items a paginated collection can hold. They arrive from the site as JSON
/// and are handed out by value to whoever reads the collection.
pub trait ManagedItem: Clone + Debug + DeserializeOwned + Send + Sync + 'static {}
