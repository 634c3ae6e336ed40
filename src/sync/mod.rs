pub mod coordinator;
pub mod offline_store;
pub mod ongoing;
pub mod preferences;

pub use coordinator::{SyncCoordinator, SyncKind, Warnings};
pub use offline_store::{MemoryOfflinePreferences, OfflinePreferences, PreferenceEntry};
pub use preferences::PreferencesSync;
