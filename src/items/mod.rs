pub mod paginated_collection;
pub mod source_state;
pub mod sources;
pub mod sources_tracker;
pub mod traits;

pub use paginated_collection::{CollectionEvent, CollectionStatus, PaginatedCollection};
pub use sources_tracker::SourcesTracker;
pub use traits::{
  item_source::{ItemSource, PageItems},
  managed_item::ManagedItem,
};
