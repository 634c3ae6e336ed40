pub mod item_source;
pub mod managed_item;
